//! Explicit random seeds.
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Consumers of randomness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedStream {
    /// Environment used for training.
    Env,
    /// Environment used for evaluation.
    EvalEnv,
    /// Index sampling of replay buffers.
    ReplayBuffer,
    /// Initial values of network parameters.
    Parameters,
    /// Noise of stochastic policies.
    Exploration,
    /// Selection of expert trajectories.
    Trajectories,
}

const N_STREAMS: usize = 6;

impl SeedStream {
    fn index(self) -> usize {
        match self {
            Self::Env => 0,
            Self::EvalEnv => 1,
            Self::ReplayBuffer => 2,
            Self::Parameters => 3,
            Self::Exploration => 4,
            Self::Trajectories => 5,
        }
    }
}

/// Derives independent seeds for every [`SeedStream`] from a single seed.
///
/// Components receive their seed at construction, so no process-wide
/// generator is ever touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SeedContext {
    seed: u64,
}

impl SeedContext {
    /// Constructs a seed context.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Returns the base seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the seed of the given stream.
    ///
    /// Stream seeds are the first draws of a generator seeded with the base
    /// seed, one draw per stream.
    pub fn seed_for(&self, stream: SeedStream) -> u64 {
        let seeds: [u64; N_STREAMS] = StdRng::seed_from_u64(self.seed).gen();
        seeds[stream.index()]
    }

    /// Returns a generator for the given stream.
    pub fn rng(&self, stream: SeedStream) -> StdRng {
        StdRng::seed_from_u64(self.seed_for(stream))
    }
}
