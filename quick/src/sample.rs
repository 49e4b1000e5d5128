//! Drawing concrete values from generator trees.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use rand::distributions::{Alphanumeric, Distribution};
use tracing::warn;

use crate::config::Config;
use crate::error::{Error, PropertyError, Result};
use crate::generator::{Compose, Domain, Generator, GeneratorSpec, PrimitiveKind};
use crate::value::Value;

/// Structure behind a sampled value, kept so it can be shrunk and rebuilt
#[derive(Debug, Clone)]
pub enum Parts {
    Leaf,
    Elements(Vec<Sample>),
    Entries(Vec<(Sample, Sample)>),
    Children(Vec<Sample>),
}

/// A concrete value together with the generator that produced it
#[derive(Debug, Clone)]
pub struct Sample {
    value: Value,
    spec: Arc<GeneratorSpec>,
    parts: Parts,
}

impl Sample {
    pub fn leaf(spec: Arc<GeneratorSpec>, value: Value) -> Self {
        Self {
            value,
            spec,
            parts: Parts::Leaf,
        }
    }

    pub fn sequence(spec: Arc<GeneratorSpec>, elements: Vec<Sample>) -> Self {
        let value = Value::List(elements.iter().map(|s| s.value.clone()).collect());
        Self {
            value,
            spec,
            parts: Parts::Elements(elements),
        }
    }

    /// Build a mapping sample; later entries overwrite earlier ones with an equal key
    pub fn mapping(spec: Arc<GeneratorSpec>, entries: Vec<(Sample, Sample)>) -> Self {
        let mut by_key: BTreeMap<Value, (Sample, Sample)> = BTreeMap::new();
        for (key, value) in entries {
            by_key.insert(key.value.clone(), (key, value));
        }
        let value = Value::Map(
            by_key
                .iter()
                .map(|(k, (_, v))| (k.clone(), v.value.clone()))
                .collect(),
        );
        Self {
            value,
            spec,
            parts: Parts::Entries(by_key.into_values().collect()),
        }
    }

    pub fn composite(spec: Arc<GeneratorSpec>, value: Value, children: Vec<Sample>) -> Self {
        Self {
            value,
            spec,
            parts: Parts::Children(children),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn spec(&self) -> &Arc<GeneratorSpec> {
        &self.spec
    }

    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    /// Candidates smaller than this sample under its generator's rules
    pub fn shrink(&self) -> Box<dyn Iterator<Item = Sample>> {
        self.spec.shrink(self)
    }
}

/// Draws samples, retrying composite draws whose builder fails
#[derive(Debug, Clone)]
pub struct Sampler {
    max_build_attempts: usize,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(Config::default().max_build_attempts)
    }
}

impl Sampler {
    pub fn new(max_build_attempts: usize) -> Self {
        Self {
            max_build_attempts: max_build_attempts.max(1),
        }
    }

    /// Draw one sample from `spec` at `size`
    pub fn sample(
        &self,
        spec: &Arc<GeneratorSpec>,
        rng: &mut dyn rand::RngCore,
        size: usize,
    ) -> Result<Sample> {
        match &**spec {
            GeneratorSpec::Primitive(kind, domain) => {
                let value = primitive(*kind, *domain, rng, size);
                Ok(Sample::leaf(Arc::clone(spec), value))
            }
            GeneratorSpec::Sequence(element) => {
                let len = rng.gen_range(0..=size);
                let elements = (0..len)
                    .map(|_| self.sample(element, rng, size))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Sample::sequence(Arc::clone(spec), elements))
            }
            GeneratorSpec::Mapping(key, value) => {
                let count = rng.gen_range(0..=size);
                let entries = (0..count)
                    .map(|_| Ok((self.sample(key, rng, size)?, self.sample(value, rng, size)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Sample::mapping(Arc::clone(spec), entries))
            }
            GeneratorSpec::Compose(compose) => self.sample_composite(spec, compose, rng, size),
        }
    }

    fn sample_composite(
        &self,
        spec: &Arc<GeneratorSpec>,
        compose: &Compose,
        rng: &mut dyn rand::RngCore,
        size: usize,
    ) -> Result<Sample> {
        let mut last_error = PropertyError::raised("no attempt made");
        for attempt in 1..=self.max_build_attempts {
            let children = compose
                .params
                .iter()
                .map(|p| self.sample(&p.spec, rng, size))
                .collect::<Result<Vec<_>>>()?;
            match compose.build(children.iter().map(Sample::value)) {
                Ok(value) => return Ok(Sample::composite(Arc::clone(spec), value, children)),
                Err(error) => {
                    warn!(
                        generator = %compose.name,
                        attempt,
                        %error,
                        "builder rejected sampled children, drawing again"
                    );
                    last_error = error;
                }
            }
        }

        Err(Error::GenerationBudgetExceeded {
            generator: compose.name.clone(),
            attempts: self.max_build_attempts,
            last_error,
        })
    }
}

fn primitive(
    kind: PrimitiveKind,
    domain: Domain,
    rng: &mut dyn rand::RngCore,
    size: usize,
) -> Value {
    let bound = i64::try_from(size).unwrap_or(i64::MAX);
    match (kind, domain) {
        (PrimitiveKind::Number | PrimitiveKind::Integer, Domain::Positive) => {
            Value::Int(rng.gen_range(1..=bound.max(1)))
        }
        (PrimitiveKind::Number, Domain::Any) => {
            let bound = size as f64;
            Value::Float(rng.gen_range(-bound..=bound))
        }
        (PrimitiveKind::Integer, Domain::Any) => Value::Int(rng.gen_range(-bound..=bound)),
        (PrimitiveKind::Boolean, _) => Value::Bool(rng.r#gen()),
        (PrimitiveKind::Text, _) => {
            let len = rng.gen_range(0..=size);
            let text: String = (0..len)
                .map(|_| char::from(Alphanumeric.sample(rng)))
                .collect();
            Value::Text(text)
        }
    }
}
