//! Seeded per-node randomness.
//!
//! Each node owns a `ChaCha8Rng` seeded from the run seed, with the node id
//! selecting the ChaCha stream. Nodes therefore draw independent sequences
//! that depend only on `(seed, node)`, not on scheduling.
//!
//! Exponential waits use inverse-CDF sampling on a uniform draw, which
//! avoids a dependency on `rand_distr`.

use std::time::Duration;

use causim_core::NodeId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Draws waits, send decisions and neighbor choices for one node.
#[derive(Clone, Debug)]
pub struct EventSampler {
    rng: ChaCha8Rng,
    mean_us: f64,
}

impl EventSampler {
    /// Sampler for `node` with exponential waits of mean
    /// `mean_interarrival_ms` milliseconds.
    pub fn new(seed: u64, node: NodeId, mean_interarrival_ms: f64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(u64::from(node.0));
        Self {
            rng,
            mean_us: mean_interarrival_ms * 1000.0,
        }
    }

    /// Next wait, Exponential(rate = 1 / mean), rounded to whole
    /// microseconds.
    pub fn next_wait(&mut self) -> Duration {
        let u: f64 = self.rng.random();
        // 1 - u is in (0, 1], so the log is finite and non-positive.
        let us = -self.mean_us * (1.0 - u).ln();
        Duration::from_micros(us.round() as u64)
    }

    /// Bernoulli trial with success probability `p`. Any `p >= 1.0`
    /// always succeeds.
    pub fn should_send(&mut self, p: f64) -> bool {
        self.rng.random::<f64>() < p
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn pick(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }
}
