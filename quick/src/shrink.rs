//! Shrinking functionality for minimizing failing argument mappings.

use std::iter;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::error::PropertyError;
use crate::generator::{Compose, GeneratorSpec};
use crate::sample::{Parts, Sample};
use crate::value::{Arguments, Value};

/// Result of a shrinking operation
#[derive(Debug, Clone)]
pub struct ShrinkResult<T> {
    /// Original value that failed
    pub original: T,
    /// Minimal value that still fails
    pub minimal: T,
    /// Number of adopted candidates
    pub shrink_steps: usize,
    /// Number of candidates evaluated
    pub candidates_tried: usize,
    /// Time spent shrinking
    pub shrink_duration: Duration,
    /// False when the candidate budget ran out before a fixpoint
    pub completed: bool,
}

impl<T: Clone> ShrinkResult<T> {
    /// Create a shrink result for when no shrinking was performed
    pub fn no_shrinking(original: T) -> Self {
        Self {
            minimal: original.clone(),
            original,
            shrink_steps: 0,
            candidates_tried: 0,
            shrink_duration: Duration::from_secs(0),
            completed: true,
        }
    }
}

/// Configuration for shrinking behavior
#[derive(Debug, Clone)]
pub struct ShrinkConfig {
    /// Maximum number of candidates evaluated by one search
    pub max_candidates: usize,
}

impl Default for ShrinkConfig {
    fn default() -> Self {
        Self {
            max_candidates: 1000,
        }
    }
}

impl ShrinkConfig {
    /// Create a shrink configuration with custom candidate budget
    pub fn with_max_candidates(max_candidates: usize) -> Self {
        Self { max_candidates }
    }
}

/// Failing arguments as named samples, in declaration order
pub type NamedSamples = Vec<(String, Sample)>;

/// Plain argument mapping of named samples
pub fn to_arguments(samples: &[(String, Sample)]) -> Arguments {
    samples
        .iter()
        .map(|(name, sample)| (name.clone(), sample.value().clone()))
        .collect()
}

/// Greedy, round-robin search for a locally minimal failing mapping
pub struct ShrinkEngine {
    config: ShrinkConfig,
}

impl ShrinkEngine {
    /// Create a new shrinking engine with default configuration
    pub fn new() -> Self {
        Self {
            config: ShrinkConfig::default(),
        }
    }

    /// Create a new shrinking engine with custom configuration
    pub fn with_config(config: ShrinkConfig) -> Self {
        Self { config }
    }

    /// Shrink a failing mapping.
    ///
    /// Parameters are scanned in declaration order; the first candidate that
    /// still fails is adopted and the scan restarts from the first parameter.
    /// The search ends after a full round without adoption or when the
    /// candidate budget is spent. Candidates a builder rejects while
    /// rebuilding a composite count against the budget.
    pub fn shrink<F>(&self, original: NamedSamples, property: F) -> ShrinkResult<NamedSamples>
    where
        F: Fn(&Arguments) -> Result<(), PropertyError>,
    {
        let start_time = Instant::now();
        let mut current = original.clone();
        let mut shrink_steps = 0;
        let mut candidates_tried = 0;
        let mut completed = true;

        'rounds: loop {
            for index in 0..current.len() {
                let (_, sample) = &current[index];
                let mut pending = attempts(sample.spec(), sample);
                loop {
                    if candidates_tried >= self.config.max_candidates {
                        warn!(
                            candidates_tried,
                            shrink_steps, "shrink budget exhausted before reaching a fixpoint"
                        );
                        completed = false;
                        break 'rounds;
                    }
                    let Some(attempt) = pending.next() else {
                        break;
                    };
                    candidates_tried += 1;
                    let Some(candidate) = attempt else {
                        continue;
                    };

                    let mut trial = current.clone();
                    trial[index].1 = candidate;
                    if property(&to_arguments(&trial)).is_err() {
                        shrink_steps += 1;
                        debug!(
                            step = shrink_steps,
                            parameter = %trial[index].0,
                            value = %trial[index].1.value(),
                            "adopted smaller failing value"
                        );
                        current = trial;
                        continue 'rounds;
                    }
                }
            }
            break;
        }

        debug!(shrink_steps, candidates_tried, "shrinking finished");

        ShrinkResult {
            original,
            minimal: current,
            shrink_steps,
            candidates_tried,
            shrink_duration: start_time.elapsed(),
            completed,
        }
    }
}

impl Default for ShrinkEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Candidates for `sample` under the rules of `spec`, most aggressive first
pub fn candidates(
    spec: &Arc<GeneratorSpec>,
    sample: &Sample,
) -> Box<dyn Iterator<Item = Sample>> {
    Box::new(attempts(spec, sample).flatten())
}

/// Shrink attempts for `sample`, one per candidate the search has to pay for.
///
/// `None` marks a candidate a builder rejected while rebuilding a composite.
/// It counts against the shrink budget but is never evaluated.
pub fn attempts(
    spec: &Arc<GeneratorSpec>,
    sample: &Sample,
) -> Box<dyn Iterator<Item = Option<Sample>>> {
    match (&**spec, sample.parts()) {
        (GeneratorSpec::Primitive(..), Parts::Leaf) => {
            let spec = Arc::clone(spec);
            Box::new(
                primitive_candidates(sample.value())
                    .map(move |v| Some(Sample::leaf(spec.clone(), v))),
            )
        }
        (GeneratorSpec::Sequence(_), Parts::Elements(elements)) => {
            sequence_attempts(Arc::clone(spec), elements.as_slice().into())
        }
        (GeneratorSpec::Mapping(..), Parts::Entries(entries)) => {
            mapping_attempts(Arc::clone(spec), entries.as_slice().into())
        }
        (GeneratorSpec::Compose(compose), Parts::Children(children)) => compose_attempts(
            Arc::clone(spec),
            Rc::new(compose.clone()),
            children.as_slice().into(),
        ),
        _ => Box::new(iter::empty()),
    }
}

fn primitive_candidates(value: &Value) -> Box<dyn Iterator<Item = Value>> {
    match value {
        Value::Int(i) => Box::new(strategies::toward_zero(*i).map(Value::Int)),
        Value::Float(x) => Box::new(strategies::toward_zero_float(*x).map(Value::Float)),
        Value::Bool(b) => Box::new(strategies::bool_shrink(*b).map(Value::Bool)),
        Value::Text(s) => Box::new(strategies::text_shrink(s).map(Value::Text)),
        _ => Box::new(iter::empty()),
    }
}

fn sequence_attempts(
    spec: Arc<GeneratorSpec>,
    elements: Rc<[Sample]>,
) -> Box<dyn Iterator<Item = Option<Sample>>> {
    let structural = {
        let spec = Arc::clone(&spec);
        strategies::structural(Rc::clone(&elements))
            .map(move |v| Some(Sample::sequence(spec.clone(), v)))
    };
    let elementwise = (0..elements.len()).flat_map(move |i| {
        let spec = Arc::clone(&spec);
        let elements = Rc::clone(&elements);
        attempts(elements[i].spec(), &elements[i]).map(move |attempt| {
            attempt.map(|candidate| {
                let mut shrunk = elements.to_vec();
                shrunk[i] = candidate;
                Sample::sequence(spec.clone(), shrunk)
            })
        })
    });
    Box::new(structural.chain(elementwise))
}

fn mapping_attempts(
    spec: Arc<GeneratorSpec>,
    entries: Rc<[(Sample, Sample)]>,
) -> Box<dyn Iterator<Item = Option<Sample>>> {
    let removals = {
        let spec = Arc::clone(&spec);
        let entries = Rc::clone(&entries);
        (0..entries.len()).map(move |i| {
            let mut shrunk = entries.to_vec();
            shrunk.remove(i);
            Some(Sample::mapping(spec.clone(), shrunk))
        })
    };
    let values = (0..entries.len()).flat_map(move |i| {
        let spec = Arc::clone(&spec);
        let entries = Rc::clone(&entries);
        let value = &entries[i].1;
        attempts(value.spec(), value).map(move |attempt| {
            attempt.map(|candidate| {
                let mut shrunk = entries.to_vec();
                shrunk[i].1 = candidate;
                Sample::mapping(spec.clone(), shrunk)
            })
        })
    });
    Box::new(removals.chain(values))
}

fn compose_attempts(
    spec: Arc<GeneratorSpec>,
    compose: Rc<Compose>,
    children: Rc<[Sample]>,
) -> Box<dyn Iterator<Item = Option<Sample>>> {
    Box::new((0..children.len()).flat_map(move |i| {
        let spec = Arc::clone(&spec);
        let compose = Rc::clone(&compose);
        let children = Rc::clone(&children);
        attempts(children[i].spec(), &children[i]).map(move |attempt| {
            let candidate = attempt?;
            let mut rebuilt = children.to_vec();
            rebuilt[i] = candidate;
            match compose.build(rebuilt.iter().map(Sample::value)) {
                Ok(value) => Some(Sample::composite(spec.clone(), value, rebuilt)),
                Err(error) => {
                    trace!(
                        generator = %compose.name,
                        %error,
                        "skipping candidate the builder rejected"
                    );
                    None
                }
            }
        })
    }))
}

/// Candidate rules for individual value kinds
pub mod strategies {
    use std::iter;
    use std::rc::Rc;

    use num_traits::{Float, PrimInt, Signed};

    /// Integer shrinking: zero, then bisection toward the value.
    ///
    /// After zero come `v - v/2, v - v/4, ..., v - 1`, each strictly closer to
    /// zero than `v`. The last candidate is always `v - 1`, so a greedy search
    /// settles exactly on a failure boundary in a logarithmic number of steps.
    pub fn toward_zero<T>(value: T) -> Box<dyn Iterator<Item = T>>
    where
        T: PrimInt + Signed + 'static,
    {
        if value.is_zero() {
            return Box::new(iter::empty());
        }

        let two = T::one() + T::one();
        let bisection = iter::successors(Some(value / two), move |&h| Some(h / two))
            .take_while(|h| !h.is_zero())
            .map(move |h| value - h);

        Box::new(iter::once(T::zero()).chain(bisection))
    }

    /// Float shrinking: zero, the truncated value, then bisection of the
    /// truncated value toward it
    pub fn toward_zero_float<T>(value: T) -> Box<dyn Iterator<Item = T>>
    where
        T: Float + 'static,
    {
        if value.is_zero() || !value.is_finite() {
            return Box::new(iter::empty());
        }

        let two = T::one() + T::one();
        let whole = value.trunc();
        let truncated = (whole != value && !whole.is_zero()).then_some(whole);
        // Large magnitudes lose the low bits; drop candidates that round back up
        let bisection = iter::successors(Some((whole / two).trunc()), move |&h| {
            Some((h / two).trunc())
        })
        .take_while(|h| !h.is_zero())
        .map(move |h| whole - h)
        .filter(move |c| c.abs() < whole.abs());

        Box::new(iter::once(T::zero()).chain(truncated).chain(bisection))
    }

    /// Boolean shrinking - only try false if true
    pub fn bool_shrink(value: bool) -> Box<dyn Iterator<Item = bool>> {
        if value {
            Box::new(iter::once(false))
        } else {
            Box::new(iter::empty())
        }
    }

    /// Removal candidates: empty, each single removal, then both halves
    ///
    /// Candidates that would repeat an earlier one (removing the only item,
    /// halving two items) are not produced.
    pub fn structural<T: Clone + 'static>(items: Rc<[T]>) -> Box<dyn Iterator<Item = Vec<T>>> {
        let len = items.len();
        let empty = (len > 0).then(Vec::new);
        let removals = {
            let items = Rc::clone(&items);
            (0..if len > 1 { len } else { 0 }).map(move |i| {
                let mut shrunk = items.to_vec();
                shrunk.remove(i);
                shrunk
            })
        };
        let mid = len / 2;
        let halves = (0..if len > 2 { 2 } else { 0 }).map(move |half| {
            if half == 0 {
                items[..mid].to_vec()
            } else {
                items[mid..].to_vec()
            }
        });

        Box::new(empty.into_iter().chain(removals).chain(halves))
    }

    /// Text shrinking: structural removals, then simplifying characters to `a`
    pub fn text_shrink(s: &str) -> Box<dyn Iterator<Item = String>> {
        let chars: Rc<[char]> = s.chars().collect();
        let structural =
            structural(Rc::clone(&chars)).map(|v| v.into_iter().collect::<String>());
        let simplified = (0..chars.len())
            .filter({
                let chars = Rc::clone(&chars);
                move |&i| chars[i] != 'a'
            })
            .map(move |i| {
                let mut shrunk = chars.to_vec();
                shrunk[i] = 'a';
                shrunk.into_iter().collect::<String>()
            });

        Box::new(structural.chain(simplified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Generator;
    use crate::resolve::{
        boolean, builder, dict_of, list_of, number, positive_num, resolve, text, Description,
    };

    fn leaf(description: &Description, value: Value) -> Sample {
        Sample::leaf(resolve(description).unwrap(), value)
    }

    fn values(sample: &Sample) -> Vec<Value> {
        sample.shrink().map(Sample::into_value).collect()
    }

    #[test]
    fn test_shrink_config_defaults() {
        assert_eq!(ShrinkConfig::default().max_candidates, 1000);
        assert_eq!(ShrinkConfig::with_max_candidates(5).max_candidates, 5);
    }

    #[test]
    fn test_shrink_result_no_shrinking() {
        let result = ShrinkResult::no_shrinking(42);
        assert_eq!(result.original, 42);
        assert_eq!(result.minimal, 42);
        assert_eq!(result.shrink_steps, 0);
        assert!(result.completed);
    }

    #[test]
    fn test_integer_candidates_converge_to_zero() {
        let shrunk: Vec<i64> = strategies::toward_zero(40i64).collect();
        assert_eq!(shrunk, vec![0, 20, 30, 35, 38, 39]);

        let shrunk: Vec<i64> = strategies::toward_zero(-9i64).collect();
        assert_eq!(shrunk, vec![0, -5, -7, -8]);

        let shrunk: Vec<i64> = strategies::toward_zero(2i64).collect();
        assert_eq!(shrunk, vec![0, 1]);

        let shrunk: Vec<i64> = strategies::toward_zero(1i64).collect();
        assert_eq!(shrunk, vec![0]);

        assert_eq!(strategies::toward_zero(0i64).count(), 0);
    }

    #[test]
    fn test_integer_candidates_never_move_away_from_zero() {
        for value in [-1000i64, -17, -2, 3, 64, 999] {
            for candidate in strategies::toward_zero(value) {
                assert!(candidate.abs() < value.abs(), "{} from {}", candidate, value);
            }
        }
    }

    #[test]
    fn test_float_candidates() {
        let shrunk: Vec<f64> = strategies::toward_zero_float(6.5).collect();
        assert_eq!(shrunk, vec![0.0, 6.0, 3.0, 5.0]);

        let shrunk: Vec<f64> = strategies::toward_zero_float(-1.5).collect();
        assert_eq!(shrunk, vec![0.0, -1.0]);

        let shrunk: Vec<f64> = strategies::toward_zero_float(-0.25).collect();
        assert_eq!(shrunk, vec![0.0]);

        for value in [-73.9f64, -1.5, 0.75, 12.0, 99.99] {
            for candidate in strategies::toward_zero_float(value) {
                assert!(candidate.abs() < value.abs());
            }
        }
    }

    #[test]
    fn test_bool_candidates() {
        assert_eq!(values(&leaf(&boolean(), Value::Bool(true))), vec![Value::Bool(false)]);
        assert!(values(&leaf(&boolean(), Value::Bool(false))).is_empty());
    }

    #[test]
    fn test_structural_candidates_order() {
        let items: Rc<[i32]> = vec![1, 2, 3, 4].into();
        let shrunk: Vec<Vec<i32>> = strategies::structural(items).collect();
        assert_eq!(
            shrunk,
            vec![
                vec![],
                vec![2, 3, 4],
                vec![1, 3, 4],
                vec![1, 2, 4],
                vec![1, 2, 3],
                vec![1, 2],
                vec![3, 4],
            ]
        );

        let empty: Rc<[i32]> = Vec::new().into();
        assert_eq!(strategies::structural(empty).count(), 0);
    }

    #[test]
    fn test_text_candidates() {
        let shrunk: Vec<String> = strategies::text_shrink("ab").collect();
        assert_eq!(shrunk, vec!["", "b", "a", "aa"]);
        assert!(strategies::text_shrink("").next().is_none());
        assert_eq!(strategies::text_shrink("a").collect::<Vec<_>>(), vec![""]);
    }

    #[test]
    fn test_sequence_structural_before_elementwise() {
        let spec = resolve(&list_of(positive_num())).unwrap();
        let element = resolve(&positive_num()).unwrap();
        let sample = Sample::sequence(
            spec,
            vec![
                Sample::leaf(element.clone(), Value::Int(3)),
                Sample::leaf(element, Value::Int(8)),
            ],
        );

        let shrunk = values(&sample);
        let list = |items: &[i64]| Value::List(items.iter().copied().map(Value::Int).collect());
        assert_eq!(shrunk[0], list(&[]));
        assert_eq!(shrunk[1], list(&[8]));
        assert_eq!(shrunk[2], list(&[3]));
        assert_eq!(shrunk[3], list(&[0, 8]));
        assert!(shrunk.contains(&list(&[3, 0])));
        assert!(shrunk.contains(&list(&[3, 4])));
    }

    #[test]
    fn test_mapping_candidates() {
        let spec = resolve(&dict_of(text(), positive_num())).unwrap();
        let key = resolve(&text()).unwrap();
        let value = resolve(&positive_num()).unwrap();
        let sample = Sample::mapping(
            spec,
            vec![
                (
                    Sample::leaf(key.clone(), Value::from("k")),
                    Sample::leaf(value.clone(), Value::Int(2)),
                ),
                (
                    Sample::leaf(key, Value::from("m")),
                    Sample::leaf(value, Value::Int(1)),
                ),
            ],
        );

        let shrunk = values(&sample);
        let map = |entries: &[(&str, i64)]| {
            Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (Value::from(*k), Value::Int(*v)))
                    .collect(),
            )
        };
        assert_eq!(shrunk[0], map(&[("m", 1)]));
        assert_eq!(shrunk[1], map(&[("k", 2)]));
        assert!(shrunk.contains(&map(&[("k", 0), ("m", 1)])));
        assert!(shrunk.contains(&map(&[("k", 2), ("m", 0)])));
    }

    #[test]
    fn test_compose_candidates_skip_rejected_builds() {
        let description = builder("nonzero")
            .param("n", positive_num())
            .build(|args: &Arguments| -> Result<i64, String> {
                let n = args.int("n").map_err(|e| e.to_string())?;
                if n == 0 {
                    Err("zero".to_string())
                } else {
                    Ok(n * 10)
                }
            });
        let spec = resolve(&description).unwrap();
        let child = Sample::leaf(resolve(&positive_num()).unwrap(), Value::Int(8));
        let sample = Sample::composite(spec.clone(), Value::Int(80), vec![child]);

        let shrunk: Vec<Value> = spec.shrink(&sample).map(Sample::into_value).collect();
        assert_eq!(
            shrunk,
            vec![Value::Int(40), Value::Int(60), Value::Int(70)]
        );
    }

    #[test]
    fn test_engine_finds_boundary() {
        let spec = resolve(&positive_num()).unwrap();
        let original = vec![("x".to_string(), Sample::leaf(spec, Value::Int(73)))];

        let result = ShrinkEngine::new().shrink(original, |args| {
            if args.int("x")? < 10 {
                Ok(())
            } else {
                Err(PropertyError::Falsified)
            }
        });

        assert_eq!(result.minimal[0].1.value(), &Value::Int(10));
        assert!(result.shrink_steps > 0);
        assert!(result.completed);
        assert_eq!(result.original[0].1.value(), &Value::Int(73));
    }

    #[test]
    fn test_engine_shrinks_every_parameter() {
        let spec = resolve(&number()).unwrap();
        let original = vec![
            ("x".to_string(), Sample::leaf(spec.clone(), Value::Float(17.25))),
            ("y".to_string(), Sample::leaf(spec, Value::Float(-42.5))),
        ];

        let result = ShrinkEngine::new().shrink(original, |_| Err(PropertyError::Falsified));

        assert_eq!(result.minimal[0].1.value(), &Value::Float(0.0));
        assert_eq!(result.minimal[1].1.value(), &Value::Float(0.0));
        assert_eq!(result.shrink_steps, 2);
    }

    #[test]
    fn test_engine_respects_candidate_budget() {
        let spec = resolve(&list_of(positive_num())).unwrap();
        let element = resolve(&positive_num()).unwrap();
        let elements = (1..=30)
            .map(|n| Sample::leaf(element.clone(), Value::Int(n)))
            .collect();
        let original = vec![("x".to_string(), Sample::sequence(spec, elements))];

        let engine = ShrinkEngine::with_config(ShrinkConfig::with_max_candidates(3));
        let result = engine.shrink(original, |args| {
            if args.list("x")?.len() <= 4 {
                Ok(())
            } else {
                Err(PropertyError::Falsified)
            }
        });

        assert_eq!(result.candidates_tried, 3);
        assert!(!result.completed);
        assert!(result.minimal[0].1.value().len().unwrap() < 30);
    }

    #[test]
    fn test_engine_reaches_boundary_from_wide_range() {
        let spec = resolve(&positive_num()).unwrap();
        let original = vec![("x".to_string(), Sample::leaf(spec, Value::Int(1_000_000)))];

        let result = ShrinkEngine::new().shrink(original, |args| {
            if args.int("x")? < 5000 {
                Ok(())
            } else {
                Err(PropertyError::Falsified)
            }
        });

        assert_eq!(result.minimal[0].1.value(), &Value::Int(5000));
        assert!(result.completed);
        assert!(result.candidates_tried < 500);
    }

    #[test]
    fn test_rejected_builds_count_against_budget() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let description = builder("odd length")
            .param("xs", list_of(positive_num()))
            .build(move |args: &Arguments| -> Result<i64, String> {
                counter.fetch_add(1, Ordering::Relaxed);
                let len = args.list("xs").map_err(|e| e.to_string())?.len();
                if len % 2 == 1 {
                    Ok(len as i64)
                } else {
                    Err(format!("{} is even", len))
                }
            });
        let spec = resolve(&description).unwrap();
        let element = resolve(&positive_num()).unwrap();
        let elements = (1..=7)
            .map(|n| Sample::leaf(element.clone(), Value::Int(n)))
            .collect();
        let list = Sample::sequence(resolve(&list_of(positive_num())).unwrap(), elements);
        let original = vec![("x".to_string(), Sample::composite(spec, Value::Int(7), vec![list]))];

        let engine = ShrinkEngine::with_config(ShrinkConfig::with_max_candidates(5));
        let result = engine.shrink(original, |_| Err(PropertyError::Falsified));

        assert_eq!(calls.load(Ordering::Relaxed), 5);
        assert_eq!(result.candidates_tried, 5);
        assert_eq!(result.shrink_steps, 0);
        assert!(!result.completed);
        assert_eq!(result.minimal[0].1.value(), &Value::Int(7));
    }

    #[test]
    fn test_engine_keeps_minimal_input() {
        let spec = resolve(&positive_num()).unwrap();
        let original = vec![("x".to_string(), Sample::leaf(spec, Value::Int(0)))];

        let result = ShrinkEngine::new().shrink(original, |_| Err(PropertyError::Falsified));

        assert_eq!(result.shrink_steps, 0);
        assert_eq!(result.candidates_tried, 0);
        assert_eq!(to_arguments(&result.minimal), to_arguments(&result.original));
    }
}
