//! Random draws for the simulations.
//!
//! Every probabilistic rule (battle rolls, recon discovery, village growth,
//! autonomous creation) pulls uniform values in `[0, 1)` through
//! [`RandomSource`], so tests can pin the exact sequence.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn next_f64(&mut self) -> f64;
}

/// Production source: ChaCha8 seeded once at startup.
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed from the wall clock. Runs differ; saves do not depend on it.
    pub fn from_clock() -> Self {
        Self::new(crate::time::now_ms())
    }
}

impl RandomSource for SeededRandom {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of draws, then repeats the last one.
#[cfg(test)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    pos: usize,
}

#[cfg(test)]
impl ScriptedRandom {
    pub fn new(values: &[f64]) -> Self {
        assert!(!values.is_empty());
        Self {
            values: values.to_vec(),
            pos: 0,
        }
    }

    /// Number of draws consumed so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
impl RandomSource for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        let idx = self.pos.min(self.values.len() - 1);
        self.pos += 1;
        self.values[idx]
    }
}
