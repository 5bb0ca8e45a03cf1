//! Benchmark profiles for the causim simulator.
//!
//! - [`reference_profile`]: 10 fully connected nodes, `m = 20`
//! - [`sweep_profile`]: complete graph of any size, the shape used by the
//!   naive-vs-SK overhead sweep
//! - [`busy_clock`]: a vector clock with every component populated

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use causim_clock::AlgorithmKind;
use causim_core::{SimParams, VectorClock};
use causim_engine::{SimConfig, Topology, TopologyError};

/// Complete graph on `node_count` nodes with `l = 1.0`, `a = 1.0` and the
/// given quota.
pub fn sweep_profile(
    node_count: usize,
    send_quota: usize,
    algorithm: AlgorithmKind,
    seed: u64,
) -> Result<SimConfig, TopologyError> {
    let params = SimParams {
        node_count,
        mean_interarrival_ms: 1.0,
        send_bias: 1.0,
        send_quota,
    };
    Ok(SimConfig::new(params, Topology::complete(node_count)?, algorithm).with_seed(seed))
}

/// Reference benchmark profile: 10 nodes, complete graph, 20 sends each.
pub fn reference_profile(algorithm: AlgorithmKind, seed: u64) -> SimConfig {
    match sweep_profile(10, 20, algorithm, seed) {
        Ok(config) => config,
        Err(e) => unreachable!("complete graph on 10 nodes is valid: {e}"),
    }
}

/// Clock of width `n` with component `k` set to `k + 1`.
pub fn busy_clock(n: usize) -> VectorClock {
    let components: Vec<u32> = (1..=n as u32).collect();
    VectorClock::from_components(&components)
}
