//! Deterministic seed derivation.
//!
//! A master seed is expanded into a sub-seed per `(symbol, interval)` pair via
//! BLAKE3. Derivation is hash-based, so a timeframe's clustering seed does not
//! depend on which other timeframes are processed or in what order.

use crate::domain::Interval;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Deterministic RNG hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Sub-seed for one symbol/timeframe pair.
    pub fn sub_seed(&self, symbol: &str, interval: Interval) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(interval.as_str().as_bytes());
        first_u64(hasher.finalize().as_bytes())
    }

    pub fn rng_for(&self, symbol: &str, interval: Interval) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(symbol, interval))
    }
}

/// Seed derived from a symbol alone (synthetic data generation).
pub fn symbol_seed(symbol: &str) -> u64 {
    first_u64(blake3::hash(symbol.as_bytes()).as_bytes())
}

fn first_u64(bytes: &[u8; 32]) -> u64 {
    let mut head = [0u8; 8];
    head.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(head)
}
