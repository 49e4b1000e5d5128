//! Experiment registry and the verification loop.
//!
//! A [`QuickCheck`] instance owns a table of [`Experiment`]s. Each experiment
//! pairs a property with the generator trees resolved for its parameters.
//! [`verify`] runs the trials, and shrinks the first failing mapping when
//! asked to.

use std::fmt;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, PropertyError, Result};
use crate::generator::Param;
use crate::property::{self, PropertyFn, Testable};
use crate::resolve::{Description, Resolver};
use crate::rng::create_rng;
use crate::sample::Sampler;
use crate::shrink::{NamedSamples, ShrinkConfig, ShrinkEngine, ShrinkResult, to_arguments};
use crate::value::Arguments;

/// Identity of an experiment within its runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExperimentId(usize);

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered property and its resolved generators
#[derive(Clone)]
pub struct Experiment {
    id: ExperimentId,
    name: String,
    params: Vec<Param>,
    property: PropertyFn,
    config: Config,
}

impl Experiment {
    pub fn id(&self) -> ExperimentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Evaluate the property; a `false` result, an error, and a panic all fail
    pub fn evaluate(&self, args: &Arguments) -> std::result::Result<(), PropertyError> {
        property::evaluate(&self.property, args)
    }

    fn sample_arguments(
        &self,
        sampler: &Sampler,
        rng: &mut dyn rand::RngCore,
        size: usize,
    ) -> Result<NamedSamples> {
        self.params
            .iter()
            .map(|p| Ok((p.name.clone(), sampler.sample(&p.spec, rng, size)?)))
            .collect()
    }
}

impl fmt::Debug for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Experiment")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// One property evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub trial: usize,
    pub size: usize,
    pub arguments: Arguments,
    pub passed: bool,
}

/// Why a verification did not pass
#[derive(Debug, Clone)]
pub enum FailureReason {
    /// The property failed on the reported arguments
    Property(PropertyError),
    /// Arguments could not be generated
    Generation(Error),
}

/// Outcome of one verification call
#[derive(Debug, Clone)]
pub struct Verdict {
    /// All trials passed
    pub ok: bool,
    /// The first failing arguments
    pub arguments: Option<Arguments>,
    /// `simplified_to` differs from `arguments`
    pub shrunk: bool,
    /// The minimized failing arguments
    pub simplified_to: Option<Arguments>,
    /// Trials run
    pub trials: usize,
    /// Adopted shrink candidates
    pub shrink_steps: usize,
    /// False when shrinking stopped on its candidate budget
    pub shrink_completed: bool,
    pub reason: Option<FailureReason>,
    pub history: Vec<TrialRecord>,
}

impl Verdict {
    fn passed(history: Vec<TrialRecord>) -> Self {
        Self {
            ok: true,
            arguments: None,
            shrunk: false,
            simplified_to: None,
            trials: history.len(),
            shrink_steps: 0,
            shrink_completed: true,
            reason: None,
            history,
        }
    }

    fn failed(
        arguments: Arguments,
        simplified_to: Arguments,
        error: PropertyError,
        history: Vec<TrialRecord>,
    ) -> Self {
        Self {
            ok: false,
            shrunk: simplified_to != arguments,
            arguments: Some(arguments),
            simplified_to: Some(simplified_to),
            trials: history.len(),
            shrink_steps: 0,
            shrink_completed: true,
            reason: Some(FailureReason::Property(error)),
            history,
        }
    }

    fn generation_failed(error: Error, history: Vec<TrialRecord>) -> Self {
        Self {
            ok: false,
            arguments: None,
            shrunk: false,
            simplified_to: None,
            trials: history.len(),
            shrink_steps: 0,
            shrink_completed: true,
            reason: Some(FailureReason::Generation(error)),
            history,
        }
    }
}

/// Run the trials of `experiment`, shrinking the first failure when `minimize` is set
pub fn verify(experiment: &Experiment, minimize: bool) -> Verdict {
    let config = experiment.config();
    let mut rng = create_rng(config.seed);
    let sampler = Sampler::new(config.max_build_attempts);
    let mut history = Vec::new();

    for trial in 0..config.max_count {
        let size = config.size_for_trial(trial);
        let samples = match experiment.sample_arguments(&sampler, &mut rng, size) {
            Ok(samples) => samples,
            Err(error) => {
                info!(experiment = %experiment.name, trial, %error, "could not generate arguments");
                return Verdict::generation_failed(error, history);
            }
        };
        let arguments = to_arguments(&samples);
        let outcome = experiment.evaluate(&arguments);
        history.push(TrialRecord {
            trial,
            size,
            arguments: arguments.clone(),
            passed: outcome.is_ok(),
        });

        let Err(error) = outcome else {
            continue;
        };
        debug!(experiment = %experiment.name, trial, size, %arguments, %error, "trial failed");

        let result = if minimize {
            let engine = ShrinkEngine::with_config(ShrinkConfig::with_max_candidates(
                config.max_shrink_candidates,
            ));
            engine.shrink(samples, |args| experiment.evaluate(args))
        } else {
            ShrinkResult::no_shrinking(samples)
        };
        let simplified_to = to_arguments(&result.minimal);
        info!(
            experiment = %experiment.name,
            trial,
            shrink_steps = result.shrink_steps,
            %simplified_to,
            "property falsified"
        );

        let mut verdict = Verdict::failed(arguments, simplified_to, error, history);
        verdict.shrink_steps = result.shrink_steps;
        verdict.shrink_completed = result.completed;
        return verdict;
    }

    info!(experiment = %experiment.name, trials = history.len(), "property held");
    Verdict::passed(history)
}

/// Verdict of one experiment in a suite run
#[derive(Debug, Clone)]
pub struct Report {
    pub id: ExperimentId,
    pub name: String,
    pub verdict: Verdict,
}

impl Report {
    pub(crate) fn new(experiment: &Experiment, verdict: Verdict) -> Self {
        Self {
            id: experiment.id(),
            name: experiment.name().to_string(),
            verdict,
        }
    }
}

/// An independent table of experiments
#[derive(Debug, Default)]
pub struct QuickCheck {
    config: Config,
    experiments: Vec<Experiment>,
}

impl QuickCheck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runner whose experiments default to `config`
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            experiments: Vec::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start registering a property described by `name`
    pub fn forall(&mut self, name: impl Into<String>) -> ForallBuilder<'_> {
        let config = self.config.clone();
        ForallBuilder {
            runner: self,
            name: name.into(),
            config,
            params: Vec::new(),
        }
    }

    pub fn experiment(&self, id: ExperimentId) -> Option<&Experiment> {
        self.experiments.get(id.0)
    }

    /// The earliest experiment registered under `name`
    pub fn get(&self, name: &str) -> Option<&Experiment> {
        self.experiments.iter().find(|e| e.name == name)
    }

    /// Experiments in registration order
    pub fn experiments(&self) -> impl Iterator<Item = &Experiment> {
        self.experiments.iter()
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    pub fn verify(&self, experiment: &Experiment, minimize: bool) -> Verdict {
        verify(experiment, minimize)
    }

    /// Verify every experiment in registration order
    pub fn verify_all(&self, minimize: bool) -> Vec<Report> {
        self.experiments
            .iter()
            .map(|e| Report::new(e, verify(e, minimize)))
            .collect()
    }

    pub(crate) fn experiment_slice(&self) -> &[Experiment] {
        &self.experiments
    }
}

/// Registration in progress; see [`QuickCheck::forall`]
pub struct ForallBuilder<'a> {
    runner: &'a mut QuickCheck,
    name: String,
    config: Config,
    params: Vec<(String, Description)>,
}

impl ForallBuilder<'_> {
    /// Declare the next parameter and its generator
    pub fn arg(mut self, name: impl Into<String>, description: impl Into<Description>) -> Self {
        self.params.push((name.into(), description.into()));
        self
    }

    /// Number of trials for this experiment
    pub fn max_count(mut self, max_count: usize) -> Self {
        self.config.max_count = max_count;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Replace the configuration inherited from the runner
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Resolve the parameters and add the experiment to the runner
    pub fn register<F, R>(self, property: F) -> Result<ExperimentId>
    where
        F: Fn(&Arguments) -> R + Send + Sync + 'static,
        R: Testable,
    {
        self.config.validate()?;
        let resolver = Resolver::new(self.config.max_depth);
        let params = self
            .params
            .iter()
            .map(|(name, description)| {
                Ok(Param {
                    name: name.clone(),
                    spec: resolver.resolve(name, description)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let id = ExperimentId(self.runner.experiments.len());
        debug!(experiment = %self.name, %id, params = params.len(), "registered experiment");
        self.runner.experiments.push(Experiment {
            id,
            name: self.name,
            params,
            property: property::erase(property),
            config: self.config,
        });
        Ok(id)
    }
}
