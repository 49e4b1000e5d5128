//! Configuration types for controlling trials, sizes, and search budgets.

use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid number of trials (must be > 0)
    #[error("Invalid trial count: {0} (must be > 0)")]
    InvalidMaxCount(usize),
    /// Size bounds are inverted
    #[error("Invalid size range: min {min} exceeds max {max}")]
    InvalidSizeRange { min: usize, max: usize },
    /// Invalid max depth (must be > 0)
    #[error("Invalid max depth: {0} (must be > 0)")]
    InvalidMaxDepth(usize),
    /// Invalid number of build attempts (must be > 0)
    #[error("Invalid build attempts: {0} (must be > 0)")]
    InvalidBuildAttempts(usize),
    /// Invalid shrink budget (must be > 0)
    #[error("Invalid shrink candidate budget: {0} (must be > 0)")]
    InvalidShrinkCandidates(usize),
}

/// Configuration for experiments and the runner that owns them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of trials per verification
    pub max_count: usize,
    /// Size used for the first trial
    pub min_size: usize,
    /// Size reached by the last trial
    pub max_size: usize,
    /// Maximum nesting depth accepted while resolving descriptions
    pub max_depth: usize,
    /// How many times a composite draw is retried when its builder fails
    pub max_build_attempts: usize,
    /// Maximum candidates evaluated by one shrink search
    pub max_shrink_candidates: usize,
    /// Optional seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_count: 100,
            min_size: 1,
            max_size: 100,
            max_depth: 16,
            max_build_attempts: 16,
            max_shrink_candidates: 1000,
            seed: None,
        }
    }
}

impl Config {
    /// Set the number of trials
    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    /// Set the size range swept across the trials
    pub fn with_sizes(mut self, min_size: usize, max_size: usize) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }

    /// Set the resolution depth cutoff
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the number of attempts for a failing composite draw
    pub fn with_max_build_attempts(mut self, attempts: usize) -> Self {
        self.max_build_attempts = attempts;
        self
    }

    /// Set the shrink candidate budget
    pub fn with_max_shrink_candidates(mut self, candidates: usize) -> Self {
        self.max_shrink_candidates = candidates;
        self
    }

    /// Fix the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_count == 0 {
            return Err(ConfigError::InvalidMaxCount(self.max_count));
        }
        if self.min_size > self.max_size {
            return Err(ConfigError::InvalidSizeRange {
                min: self.min_size,
                max: self.max_size,
            });
        }
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidMaxDepth(self.max_depth));
        }
        if self.max_build_attempts == 0 {
            return Err(ConfigError::InvalidBuildAttempts(self.max_build_attempts));
        }
        if self.max_shrink_candidates == 0 {
            return Err(ConfigError::InvalidShrinkCandidates(
                self.max_shrink_candidates,
            ));
        }
        Ok(())
    }

    /// Size for the given trial: a linear sweep from `min_size` to `max_size`
    pub fn size_for_trial(&self, trial: usize) -> usize {
        let span = self.max_size.saturating_sub(self.min_size);
        let last = self.max_count.saturating_sub(1).max(1);
        let trial = trial.min(last);
        self.min_size + span * trial / last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.max_count, 100);
        assert_eq!(config.min_size, 1);
        assert_eq!(config.max_size, 100);
        assert_eq!(config.max_depth, 16);
        assert_eq!(config.max_shrink_candidates, 1000);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert_eq!(
            Config::default().with_max_count(0).validate(),
            Err(ConfigError::InvalidMaxCount(0))
        );
        assert_eq!(
            Config::default().with_sizes(10, 5).validate(),
            Err(ConfigError::InvalidSizeRange { min: 10, max: 5 })
        );
        assert_eq!(
            Config::default().with_max_depth(0).validate(),
            Err(ConfigError::InvalidMaxDepth(0))
        );
        assert_eq!(
            Config::default().with_max_build_attempts(0).validate(),
            Err(ConfigError::InvalidBuildAttempts(0))
        );
        assert_eq!(
            Config::default().with_max_shrink_candidates(0).validate(),
            Err(ConfigError::InvalidShrinkCandidates(0))
        );
    }

    #[test]
    fn test_size_schedule_is_monotonic() {
        let config = Config::default();
        let sizes: Vec<usize> = (0..config.max_count)
            .map(|t| config.size_for_trial(t))
            .collect();

        assert_eq!(sizes[0], config.min_size);
        assert_eq!(*sizes.last().unwrap(), config.max_size);
        assert!(sizes.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_size_schedule_single_trial() {
        let config = Config::default().with_max_count(1).with_sizes(3, 50);
        assert_eq!(config.size_for_trial(0), 3);
        assert_eq!(Config::default().with_sizes(7, 7).size_for_trial(42), 7);
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::InvalidMaxCount(0).to_string(),
            "Invalid trial count: 0 (must be > 0)"
        );
    }
}
