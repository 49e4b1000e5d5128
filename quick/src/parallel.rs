//! Parallel execution of an experiment suite.

use tracing::debug;

use crate::error::{Error, PropertyError, Result};
use crate::runner::{QuickCheck, Report, verify};

/// Configuration for parallel execution
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of worker threads
    pub num_threads: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
        }
    }
}

impl ParallelConfig {
    pub fn with_threads(num_threads: usize) -> Self {
        Self { num_threads }
    }
}

impl QuickCheck {
    /// Verify every experiment on a pool of scoped threads.
    ///
    /// Each experiment runs on exactly one worker with its own RNG, so seeded
    /// experiments produce the same verdicts as [`QuickCheck::verify_all`].
    /// Reports come back in registration order.
    pub fn verify_all_parallel(
        &self,
        minimize: bool,
        parallel: &ParallelConfig,
    ) -> Result<Vec<Report>> {
        let experiments = self.experiment_slice();
        if experiments.is_empty() {
            return Ok(Vec::new());
        }

        let num_threads = parallel.num_threads.clamp(1, experiments.len());
        let chunk_size = experiments.len().div_ceil(num_threads);
        debug!(
            experiments = experiments.len(),
            num_threads, chunk_size, "verifying suite in parallel"
        );

        let outcome = crossbeam::scope(|s| {
            let handles: Vec<_> = experiments
                .chunks(chunk_size)
                .map(|chunk| {
                    s.spawn(move |_| {
                        chunk
                            .iter()
                            .map(|e| Report::new(e, verify(e, minimize)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            let mut reports = Vec::with_capacity(experiments.len());
            for handle in handles {
                match handle.join() {
                    Ok(batch) => reports.extend(batch),
                    Err(payload) => return Err(worker_panicked(payload)),
                }
            }
            Ok(reports)
        });

        outcome.map_err(worker_panicked)?
    }
}

fn worker_panicked(payload: Box<dyn std::any::Any + Send>) -> Error {
    let message = match PropertyError::from_panic(payload) {
        PropertyError::Panicked(message) => message,
        other => other.to_string(),
    };
    Error::WorkerPanicked { message }
}
