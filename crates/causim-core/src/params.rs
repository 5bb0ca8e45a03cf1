//! Simulation parameters `(n, l, a, m)`.

/// The four experiment parameters read from the input header.
///
/// Structural validation lives in the engine's `SimConfig::validate()`;
/// this type only carries the values and a few derived quantities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimParams {
    /// Number of nodes.
    pub node_count: usize,
    /// Mean inter-arrival time between local events, in milliseconds.
    /// Waits are drawn from Exponential(rate = `1 / mean_interarrival_ms`).
    pub mean_interarrival_ms: f64,
    /// Send bias. Each timed-out wait sends with probability `1 / (1 + a)`.
    pub send_bias: f64,
    /// Number of successful sends each node must make before draining.
    pub send_quota: usize,
}

impl SimParams {
    /// Probability that a timed-out wait turns into a send.
    ///
    /// Values above `1.0` (for `-1 < a < 0`) are returned unclamped; a
    /// Bernoulli draw against them always succeeds.
    pub fn send_probability(&self) -> f64 {
        1.0 / (1.0 + self.send_bias)
    }

    /// Total number of sends across all nodes, `m * n`.
    pub fn total_sends(&self) -> usize {
        self.send_quota * self.node_count
    }
}
