// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Uniform random index generation.

use crate::sampling::Sampler;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Uniform random sampler over [0, bound).
///
/// Bounds beyond 64 bits are sampled with two independent draws: the
/// low word uniform over the full 64-bit domain and the high word
/// uniform over [0, (bound >> 64) − 1], combined as low + high · 2^64.
/// Bounds that fit in 64 bits use the low draw alone. Every draw is
/// asserted to land inside the bound.
///
/// Each instance owns its random engine; [`with_seed`] pins it for
/// deterministic, reproducible runs. No state is shared between
/// instances.
///
/// [`with_seed`]: RandomSampler::with_seed
#[derive(Debug, Clone)]
pub struct RandomSampler {
    bound: u128,
    engine: StdRng,
    low: Uniform<u64>,
    high: Option<Uniform<u64>>,
}

impl RandomSampler {
    /// Create a sampler seeded from system entropy.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is zero.
    pub fn new(bound: u128) -> Self {
        Self::with_engine(bound, StdRng::from_entropy())
    }

    /// Create a sampler with a fixed seed, for reproducible draws.
    ///
    /// # Panics
    ///
    /// Panics if `bound` is zero.
    pub fn with_seed(bound: u128, seed: u64) -> Self {
        Self::with_engine(bound, StdRng::seed_from_u64(seed))
    }

    fn with_engine(bound: u128, engine: StdRng) -> Self {
        assert!(bound >= 1, "sampler bound must be positive");
        let (low, high) = if bound > u64::MAX as u128 {
            let high_words = (bound >> 64) as u64;
            (
                Uniform::from(0..=u64::MAX),
                Some(Uniform::from(0..=high_words - 1)),
            )
        } else {
            (Uniform::from(0..=(bound - 1) as u64), None)
        };
        Self {
            bound,
            engine,
            low,
            high,
        }
    }
}

impl Sampler for RandomSampler {
    fn bound(&self) -> u128 {
        self.bound
    }

    fn next_index(&mut self) -> u128 {
        let low = self.low.sample(&mut self.engine) as u128;
        let high = match &self.high {
            Some(distribution) => distribution.sample(&mut self.engine) as u128,
            None => 0,
        };
        let index = low + (high << 64);
        assert!(
            index < self.bound,
            "sampled index {} escaped bound {}",
            index,
            self.bound
        );
        index
    }
}
