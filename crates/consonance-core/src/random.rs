//! Injectable randomness for the analyzers and the sigil gate.
//!
//! Everything random in a chat turn draws from a [`RandomSource`], so tests
//! and seeded deployments can pin the outcome of the probabilistic parts.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of uniformly distributed values in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    /// Draw the next value in `[0, 1)`.
    fn next_unit(&self) -> f64;

    /// Draw a value uniformly in `[low, high)`.
    fn next_in(&self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_unit()
    }
}

/// Draws from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// A reproducible source seeded once at startup.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Create a source from a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&self) -> f64 {
        // A poisoned lock only means another draw panicked; the RNG state is
        // still usable.
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.random::<f64>()
    }
}

/// Always returns the same value. Used to pin probabilistic decisions.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_unit(&self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_random_is_in_unit_range() {
        let source = ThreadRandom;
        for _ in 0..1000 {
            let v = source.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn seeded_sources_repeat() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        for _ in 0..16 {
            assert!((a.next_unit() - b.next_unit()).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn next_in_scales_into_range() {
        let low = FixedRandom(0.0);
        let high = FixedRandom(0.5);
        assert!((low.next_in(0.6, 0.95) - 0.6).abs() < 1e-12);
        assert!((high.next_in(0.6, 1.0) - 0.8).abs() < 1e-12);
    }
}
