//! RNG backend integration and provider system.

use rand::SeedableRng;
use rand::rngs::StdRng;

/// Trait for providing random number generators
pub trait RngProvider: Send + Sync {
    /// The type of RNG this provider creates
    type Rng: rand::RngCore + Send;

    /// Create a new RNG instance with an optional seed
    fn create_rng(&self, seed: Option<u64>) -> Self::Rng;
}

/// Default RNG provider using `StdRng`
#[derive(Debug, Clone, Default)]
pub struct DefaultRngProvider;

impl RngProvider for DefaultRngProvider {
    type Rng = StdRng;

    fn create_rng(&self, seed: Option<u64>) -> Self::Rng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Create an RNG, seeded when a seed is given and from entropy otherwise
pub fn create_rng(seed: Option<u64>) -> StdRng {
    DefaultRngProvider.create_rng(seed)
}
