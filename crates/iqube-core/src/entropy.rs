//! Injectable randomness
//!
//! Sealing consumes entropy for nonces, salts and generated passwords. Production
//! code uses the OS generator; tests use a seeded ChaCha20 stream so that nonces
//! and derived keys are reproducible.

use rand::rngs::OsRng;
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// Source of cryptographically strong random bytes
pub trait EntropySource {
    /// Fill `dest` with random bytes
    fn fill_bytes(&mut self, dest: &mut [u8]);

    /// Produce a fixed-size random array
    fn random_array<const N: usize>(&mut self) -> [u8; N]
    where
        Self: Sized,
    {
        let mut out = [0u8; N];
        self.fill_bytes(&mut out);
        out
    }
}

/// Operating-system CSPRNG
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        OsRng.fill_bytes(dest);
    }
}

/// Deterministic ChaCha20 stream for tests and simulations
#[derive(Debug, Clone)]
pub struct SeededEntropy {
    rng: ChaCha20Rng,
}

impl SeededEntropy {
    /// Stream with the fixed seed `[42; 32]`
    pub fn deterministic() -> Self {
        Self::with_seed([42; 32])
    }

    /// Stream from a specific seed
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            rng: ChaCha20Rng::from_seed(seed),
        }
    }
}

impl EntropySource for SeededEntropy {
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest);
    }
}
