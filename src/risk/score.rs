//! Token scoring collaborator
//!
//! Stands in for a real scoring model. The contract is all callers may rely
//! on: the score is deterministic per token and bounded to a fixed range.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::config::ScoringConfig;

/// Deterministic, bounded token scorer
pub trait TokenScorer: Send + Sync {
    /// Score for the token; always inside the scorer's configured range
    fn score(&self, token: &str) -> f64;
}

/// Scorer seeding an RNG from a digest of the token id
pub struct HashScorer {
    low: f64,
    high: f64,
}

impl HashScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            low: config.low,
            high: config.high,
        }
    }
}

impl TokenScorer for HashScorer {
    fn score(&self, token: &str) -> f64 {
        let digest = Sha256::digest(token.as_bytes());
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&digest);

        let mut rng = StdRng::from_seed(seed);
        rng.gen_range(self.low..self.high)
    }
}
