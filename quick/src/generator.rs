//! The closed generator model and the `Generator` capability.

use std::fmt;
use std::sync::Arc;

use crate::error::{PropertyError, Result};
use crate::sample::{Sample, Sampler};
use crate::value::{Arguments, Value};

/// Primitive value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Floating point number
    Number,
    /// Whole number
    Integer,
    Boolean,
    /// Character sequence
    Text,
}

/// Domain constraint on a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Any,
    /// Strictly positive whole numbers
    Positive,
}

/// Function turning child values into one composite value
pub type BuildFn = Arc<dyn Fn(&Arguments) -> Result<Value, PropertyError> + Send + Sync>;

/// A named child of a composite generator
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub spec: Arc<GeneratorSpec>,
}

/// Composite generator: a builder applied to the values of its children
#[derive(Clone)]
pub struct Compose {
    pub name: String,
    pub params: Vec<Param>,
    pub builder: BuildFn,
}

impl Compose {
    /// Invoke the builder on child values given in declaration order.
    ///
    /// Errors and panics raised by the builder are both returned as `Err`.
    pub fn build<'a>(
        &self,
        values: impl IntoIterator<Item = &'a Value>,
    ) -> Result<Value, PropertyError> {
        let arguments: Arguments = self
            .params
            .iter()
            .map(|p| p.name.clone())
            .zip(values.into_iter().cloned())
            .collect();
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (self.builder)(&arguments)))
            .unwrap_or_else(|payload| Err(PropertyError::from_panic(payload)))
    }
}

impl fmt::Debug for Compose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compose")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Compose {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.params == other.params
            && Arc::ptr_eq(&self.builder, &other.builder)
    }
}

/// Recursive, immutable description of how a value is produced and shrunk
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorSpec {
    Primitive(PrimitiveKind, Domain),
    Sequence(Arc<GeneratorSpec>),
    Mapping(Arc<GeneratorSpec>, Arc<GeneratorSpec>),
    Compose(Compose),
}

impl GeneratorSpec {
    pub fn primitive(kind: PrimitiveKind, domain: Domain) -> Arc<Self> {
        Arc::new(GeneratorSpec::Primitive(kind, domain))
    }

    /// Short human-readable name of this node
    pub fn describe(&self) -> String {
        match self {
            GeneratorSpec::Primitive(kind, Domain::Any) => format!("{:?}", kind).to_lowercase(),
            GeneratorSpec::Primitive(kind, Domain::Positive) => {
                format!("positive {}", format!("{:?}", kind).to_lowercase())
            }
            GeneratorSpec::Sequence(element) => format!("[{}]", element.describe()),
            GeneratorSpec::Mapping(key, value) => {
                format!("{{{}: {}}}", key.describe(), value.describe())
            }
            GeneratorSpec::Compose(compose) => compose.name.clone(),
        }
    }
}

/// Capability of producing values and proposing smaller ones
pub trait Generator {
    /// Draw a value at the given size
    fn sample(&self, rng: &mut dyn rand::RngCore, size: usize) -> Result<Sample>;

    /// Lazily ordered candidates smaller than `sample`, most aggressive first
    fn shrink(&self, sample: &Sample) -> Box<dyn Iterator<Item = Sample>>;
}

impl Generator for Arc<GeneratorSpec> {
    /// Draws with the default composite retry limit
    /// (`Config::default().max_build_attempts`). Use [`Sampler::new`] to draw
    /// under a configured limit, as the runner does.
    fn sample(&self, rng: &mut dyn rand::RngCore, size: usize) -> Result<Sample> {
        Sampler::default().sample(self, rng, size)
    }

    fn shrink(&self, sample: &Sample) -> Box<dyn Iterator<Item = Sample>> {
        crate::shrink::candidates(self, sample)
    }
}
