use std::time::Duration;

use criterion::BenchmarkGroup;
use criterion::measurement::Measurement;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const RNG_SEED: u64 = 0x5EED_2026;
const KEY_STRIDE: u64 = 0x9E37_79B9;

/// Criterion sampling settings for one benchmark group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub sample_size: usize,
    pub warm_up: Duration,
    pub measurement: Duration,
}

impl RuntimeConfig {
    pub const SMALL: Self = Self {
        sample_size: 15,
        warm_up: Duration::from_millis(100),
        measurement: Duration::from_millis(200),
    };

    pub const MEDIUM: Self = Self {
        sample_size: 15,
        warm_up: Duration::from_millis(500),
        measurement: Duration::from_millis(1000),
    };

    pub const LARGE: Self = Self {
        sample_size: 10,
        warm_up: Duration::from_millis(800),
        measurement: Duration::from_millis(1500),
    };

    pub fn apply<M: Measurement>(self, group: &mut BenchmarkGroup<'_, M>) {
        group.sample_size(self.sample_size);
        group.warm_up_time(self.warm_up);
        group.measurement_time(self.measurement);
    }

    /// Picks a preset from the number of keys a workload starts with.
    pub fn for_size(size: usize) -> Self {
        match size {
            0..=16_000 => Self::SMALL,
            16_001..=64_000 => Self::MEDIUM,
            _ => Self::LARGE,
        }
    }
}

pub fn default_rng() -> StdRng {
    StdRng::seed_from_u64(RNG_SEED)
}

/// `len` distinct keys in random order.
pub fn distinct_keys<R: Rng + ?Sized>(rng: &mut R, len: usize) -> Vec<u64> {
    let offset = rng.random_range(0..KEY_STRIDE);
    let mut keys: Vec<u64> = (0..len as u64).map(|i| i * KEY_STRIDE + offset).collect();
    keys.shuffle(rng);
    keys
}
