//! Threaded runner: one OS thread per node, wall-clock timing.
//!
//! Each worker owns its [`ProcessNode`], its [`Mailbox`] and its [`Links`].
//! Workers share only the channels and an abort flag. They block on a start
//! gate until every thread has been spawned, then run the node loop against
//! a shared start [`Instant`]. A worker that fails or panics raises the
//! abort flag, and every other worker stops at its next wakeup, at the
//! latest one drain timeout later. The runner joins every worker before
//! merging, so a failing node never leaves threads behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use causim_core::{NodeError, NodeId};
use causim_log::EventLog;
use crossbeam_channel::Receiver;
use tracing::{error, info, info_span, warn};

use crate::channel::{build_channels, Links, Mailbox};
use crate::config::{ConfigError, SimConfig};
use crate::node::{Phase, ProcessNode};
use crate::outcome::{RunOutput, SimError};

/// Wall-clock simulation on `n` worker threads.
///
/// # Example
///
/// ```ignore
/// let output = RealtimeSimulation::new(config)?.run()?;
/// println!("average: {}", output.average_payload_bytes());
/// ```
pub struct RealtimeSimulation {
    config: SimConfig,
}

impl RealtimeSimulation {
    /// Validate `config`.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Spawn every worker, release them together, and join them all.
    pub fn run(self) -> Result<RunOutput, SimError> {
        let wiring = self
            .config
            .build_nodes()
            .into_iter()
            .zip(build_channels(&self.config.topology))
            .map(|(node, (mailbox, links))| (node, mailbox, links))
            .collect();
        run_wired(&self.config, wiring)
    }
}

/// Raises the abort flag when dropped, unless the worker finished cleanly.
/// Covers both error returns and panics.
struct AbortOnFailure {
    abort: Arc<AtomicBool>,
    finished: bool,
}

impl Drop for AbortOnFailure {
    fn drop(&mut self) {
        if !self.finished {
            self.abort.store(true, Ordering::Release);
        }
    }
}

fn run_wired(
    config: &SimConfig,
    wiring: Vec<(ProcessNode, Mailbox, Links)>,
) -> Result<RunOutput, SimError> {
    let n = wiring.len();
    info!(
        nodes = n,
        algorithm = %config.algorithm,
        seed = config.seed,
        "realtime run started"
    );

    let (gate_tx, gate_rx) = crossbeam_channel::bounded::<Instant>(n);
    let abort = Arc::new(AtomicBool::new(false));
    let mut handles: Vec<(NodeId, JoinHandle<Result<EventLog, NodeError>>)> =
        Vec::with_capacity(n);

    for (node, mailbox, links) in wiring {
        let id = node.id();
        let gate = gate_rx.clone();
        let abort = Arc::clone(&abort);
        let drain_timeout = config.drain_timeout;
        let spawned = thread::Builder::new()
            .name(format!("causim-node-{id}"))
            .spawn(move || {
                let span = info_span!("node", id = id.0);
                let _entered = span.enter();
                let mut guard = AbortOnFailure {
                    abort: Arc::clone(&abort),
                    finished: false,
                };
                let result = worker_loop(node, mailbox, links, gate, &abort, drain_timeout);
                guard.finished = result.is_ok();
                result
            });
        match spawned {
            Ok(handle) => handles.push((id, handle)),
            Err(e) => {
                // Dropping the gate releases the spawned workers without
                // a start instant; they return immediately.
                drop(gate_tx);
                for (_, handle) in handles {
                    let _ = handle.join();
                }
                return Err(ConfigError::ThreadSpawnFailed {
                    reason: format!("causim-node-{id}: {e}"),
                }
                .into());
            }
        }
    }
    drop(gate_rx);

    let start = Instant::now();
    for _ in 0..n {
        // Capacity is `n`, so this never blocks; a closed gate means
        // every worker already exited.
        let _ = gate_tx.send(start);
    }
    drop(gate_tx);

    let mut logs = Vec::with_capacity(n);
    let mut first_error: Option<SimError> = None;
    let mut first_abort: Option<SimError> = None;
    for (id, handle) in handles {
        match handle.join() {
            Ok(Ok(log)) => logs.push(log),
            Ok(Err(e @ NodeError::Aborted { .. })) => {
                warn!(node = %id, "worker aborted");
                first_abort.get_or_insert(SimError::Node(e));
            }
            Ok(Err(e)) => {
                error!(node = %id, error = %e, "worker failed");
                first_error.get_or_insert(SimError::Node(e));
            }
            Err(_) => {
                error!(node = %id, "worker panicked");
                first_error.get_or_insert(SimError::WorkerPanicked { node: id });
            }
        }
    }
    if let Some(e) = first_error.or(first_abort) {
        return Err(e);
    }

    let output = RunOutput::new(config.algorithm, logs, &config.params, start.elapsed());
    info!(
        wall_ms = output.wall_time.as_millis() as u64,
        entries = output.merged.entries().len(),
        average_payload_bytes = output.average_payload_bytes(),
        "realtime run finished"
    );
    Ok(output)
}

fn offset_us(start: Instant) -> u64 {
    start.elapsed().as_micros() as u64
}

/// Body of one worker thread.
fn worker_loop(
    mut node: ProcessNode,
    mailbox: Mailbox,
    links: Links,
    gate: Receiver<Instant>,
    abort: &AtomicBool,
    drain_timeout: Duration,
) -> Result<EventLog, NodeError> {
    let Ok(start) = gate.recv() else {
        return Ok(node.into_log());
    };
    drop(gate);

    loop {
        if abort.load(Ordering::Acquire) {
            return Err(NodeError::Aborted { node: node.id() });
        }
        for out in node.advance(offset_us(start)) {
            links.send(out)?;
        }
        if node.phase() == Phase::Terminated {
            break;
        }
        let wait = node.next_wait().unwrap_or(drain_timeout);
        match mailbox.recv_timeout(wait, node.termination())? {
            Some(payload) => node.on_payload(&payload, offset_us(start))?,
            None => {
                if let Some(out) = node.on_timeout(offset_us(start)) {
                    links.send(out)?;
                }
            }
        }
    }

    // Closing our links lets neighbors observe disconnection once they are
    // done too.
    drop(links);
    Ok(node.into_log())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Outgoing;
    use crate::topology::Topology;
    use causim_clock::AlgorithmKind;
    use causim_log::EventKind;
    use causim_test_utils::{scenario_params, triangle_edges};

    fn triangle(algorithm: AlgorithmKind) -> SimConfig {
        let topology = Topology::new(3, &triangle_edges()).unwrap();
        SimConfig::new(scenario_params(), topology, algorithm).with_seed(17)
    }

    #[test]
    fn scenario_terminates_on_threads() {
        let out = RealtimeSimulation::new(triangle(AlgorithmKind::Naive))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(out.logs.len(), 3);
        for (i, log) in out.logs.iter().enumerate() {
            assert_eq!(log.node(), NodeId(i as u32));
            assert_eq!(log.count(EventKind::Send), 5);
            assert_eq!(log.count(EventKind::TermRecv), 2);
        }
        assert!(out.merged.is_time_ordered());
        // Naive payloads are always 4 * (n + 1) bytes.
        assert_eq!(out.average_payload_bytes(), 16.0);
    }

    #[test]
    fn rejects_invalid_config() {
        let mut cfg = triangle(AlgorithmKind::Sk);
        cfg.params.send_bias = -1.0;
        assert!(matches!(
            RealtimeSimulation::new(cfg),
            Err(ConfigError::InvalidSendBias { .. })
        ));
    }

    #[test]
    fn failed_worker_stops_the_others() {
        let mut cfg = triangle(AlgorithmKind::Naive);
        cfg.drain_timeout = Duration::from_millis(20);
        let wiring: Vec<_> = cfg
            .build_nodes()
            .into_iter()
            .zip(build_channels(&cfg.topology))
            .map(|(node, (mailbox, links))| (node, mailbox, links))
            .collect();

        // Node 0 finds a malformed payload waiting before it starts.
        let junk = Outgoing {
            to: NodeId(0),
            payload: vec![1, 2, 3],
        };
        wiring[1].2.send(junk).unwrap();

        match run_wired(&cfg, wiring) {
            Err(SimError::Node(NodeError::Wire { node, .. })) => assert_eq!(node, NodeId(0)),
            other => panic!("expected Wire from node 0, got {other:?}"),
        }
    }

    #[test]
    fn abort_flag_stops_a_draining_worker() {
        let mut cfg = triangle(AlgorithmKind::Sk);
        cfg.params.send_quota = 0;
        let mut wiring: Vec<_> = cfg
            .build_nodes()
            .into_iter()
            .zip(build_channels(&cfg.topology))
            .collect();
        // Neighbors stay silent but keep their links open, so node 0 drains
        // without ever seeing a marker or a disconnection.
        let _silent = wiring.split_off(1);
        let Some((node, (mailbox, links))) = wiring.pop() else {
            panic!("node 0 missing");
        };

        let (gate_tx, gate_rx) = crossbeam_channel::bounded(1);
        gate_tx.send(Instant::now()).unwrap();
        let abort = AtomicBool::new(false);
        let result = thread::scope(|s| {
            let worker = s.spawn(|| {
                worker_loop(node, mailbox, links, gate_rx, &abort, Duration::from_millis(5))
            });
            thread::sleep(Duration::from_millis(30));
            abort.store(true, Ordering::Release);
            worker.join().unwrap()
        });
        match result {
            Err(NodeError::Aborted { node }) => assert_eq!(node, NodeId(0)),
            other => panic!("expected Aborted, got {other:?}"),
        }
    }
}
