//! Post-run causality checks over finished logs.
//!
//! [`audit`] never trusts the nodes: it recomputes every property from the
//! logged snapshots alone, so it can be pointed at logs from either runner.

use std::collections::HashMap;
use std::fmt;

use causim_core::{NodeId, VectorClock};
use causim_log::{EventKind, EventLog};

use crate::topology::Topology;

/// One broken property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// An entry's clock does not dominate the previous entry's.
    NotMonotone {
        /// Logging node.
        node: NodeId,
        /// Index of the offending entry in the node's log.
        index: usize,
    },
    /// The own component moved by the wrong amount since the previous entry.
    OwnClockStep {
        /// Logging node.
        node: NodeId,
        /// Index of the offending entry in the node's log.
        index: usize,
        /// Expected own-component value.
        expected: u32,
        /// Logged own-component value.
        found: u32,
    },
    /// Wrong number of entries of one kind.
    Count {
        /// Logging node.
        node: NodeId,
        /// Entry kind counted.
        kind: EventKind,
        /// Required count.
        expected: usize,
        /// Logged count.
        found: usize,
    },
    /// A termination marker was sent before the node's last data send.
    MarkerBeforeSend {
        /// Logging node.
        node: NodeId,
    },
    /// A send has no matching receive, or the reverse.
    Unmatched {
        /// Sender.
        from: NodeId,
        /// Receiver.
        to: NodeId,
        /// Sends logged on this link.
        sends: usize,
        /// Receives logged on this link.
        recvs: usize,
    },
    /// The k-th receive on a link does not dominate the k-th send.
    CausalityBroken {
        /// Sender.
        from: NodeId,
        /// Receiver.
        to: NodeId,
        /// Zero-based message number on the link.
        message: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotMonotone { node, index } => {
                write!(f, "node {node} entry {index}: clock went backwards")
            }
            Self::OwnClockStep {
                node,
                index,
                expected,
                found,
            } => write!(
                f,
                "node {node} entry {index}: own component {found}, expected {expected}"
            ),
            Self::Count {
                node,
                kind,
                expected,
                found,
            } => write!(f, "node {node}: {found} {kind:?} entries, expected {expected}"),
            Self::MarkerBeforeSend { node } => {
                write!(f, "node {node}: termination marker sent before last data send")
            }
            Self::Unmatched {
                from,
                to,
                sends,
                recvs,
            } => write!(f, "link {from}->{to}: {sends} sends but {recvs} receives"),
            Self::CausalityBroken { from, to, message } => write!(
                f,
                "link {from}->{to} message {message}: receive does not dominate send"
            ),
        }
    }
}

/// Result of [`audit`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditReport {
    /// Every violation found, in discovery order.
    pub violations: Vec<Violation>,
    /// Total entries examined.
    pub entries_checked: usize,
    /// Send/receive pairs matched across links.
    pub messages_matched: usize,
}

impl AuditReport {
    /// Whether no violation was found.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check finished `logs` (indexed by node id) against `topology` and the
/// per-node send `quota`.
pub fn audit(logs: &[EventLog], topology: &Topology, quota: usize) -> AuditReport {
    let mut report = AuditReport::default();
    let mut sends: HashMap<(NodeId, NodeId), Vec<&VectorClock>> = HashMap::new();
    let mut recvs: HashMap<(NodeId, NodeId), Vec<&VectorClock>> = HashMap::new();

    for log in logs {
        let node = log.node();
        check_node(log, topology.degree(node), quota, &mut report);
        for e in log.entries() {
            match (e.kind, e.peer) {
                (EventKind::Send, Some(to)) => sends.entry((node, to)).or_default().push(&e.clock),
                (EventKind::Recv, Some(from)) => {
                    recvs.entry((from, node)).or_default().push(&e.clock)
                }
                _ => {}
            }
        }
    }

    let mut links: Vec<_> = sends.keys().chain(recvs.keys()).copied().collect();
    links.sort_unstable();
    links.dedup();
    for (from, to) in links {
        let s = sends.get(&(from, to)).map(Vec::as_slice).unwrap_or(&[]);
        let r = recvs.get(&(from, to)).map(Vec::as_slice).unwrap_or(&[]);
        if s.len() != r.len() {
            report.violations.push(Violation::Unmatched {
                from,
                to,
                sends: s.len(),
                recvs: r.len(),
            });
        }
        for (message, (sent, received)) in s.iter().zip(r).enumerate() {
            report.messages_matched += 1;
            if !received.dominates(sent) {
                report
                    .violations
                    .push(Violation::CausalityBroken { from, to, message });
            }
        }
    }
    report
}

fn check_node(log: &EventLog, degree: usize, quota: usize, report: &mut AuditReport) {
    let node = log.node();
    let entries = log.entries();
    report.entries_checked += entries.len();

    let mut expected_own = 0;
    let mut previous: Option<&VectorClock> = None;
    for (index, e) in entries.iter().enumerate() {
        if let Some(prev) = previous {
            if !e.clock.dominates(prev) {
                report.violations.push(Violation::NotMonotone { node, index });
            }
        }
        let found = e.own_clock();
        if found != expected_own {
            report.violations.push(Violation::OwnClockStep {
                node,
                index,
                expected: expected_own,
                found,
            });
        }
        expected_own = found + u32::from(e.kind.is_causal());
        previous = Some(&e.clock);
    }

    for (kind, expected) in [
        (EventKind::Send, quota),
        (EventKind::TermSend, degree),
        (EventKind::TermRecv, degree),
    ] {
        let found = log.count(kind);
        if found != expected {
            report.violations.push(Violation::Count {
                node,
                kind,
                expected,
                found,
            });
        }
    }

    let last_send = entries.iter().rposition(|e| e.kind == EventKind::Send);
    let first_marker = entries.iter().position(|e| e.kind == EventKind::TermSend);
    if let (Some(s), Some(t)) = (last_send, first_marker) {
        if t < s {
            report.violations.push(Violation::MarkerBeforeSend { node });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causim_log::LogEntry;

    fn pair() -> Topology {
        Topology::new(2, &[(NodeId(0), NodeId(1))]).unwrap()
    }

    fn vc(c: &[u32]) -> VectorClock {
        VectorClock::from_components(c)
    }

    /// Node 0 sends once to node 1, both exchange markers.
    fn clean_logs() -> Vec<EventLog> {
        let (a, b) = (NodeId(0), NodeId(1));
        let mut l0 = EventLog::new(a);
        l0.record(LogEntry::send(a, b, 16, 10, &vc(&[0, 0])));
        l0.record(LogEntry::term_send(a, b, 20, &vc(&[1, 0])));
        l0.record(LogEntry::term_recv(a, 230, &vc(&[1, 0])));

        let mut l1 = EventLog::new(b);
        l1.record(LogEntry::recv(b, a, 110, &vc(&[0, 0])));
        l1.record(LogEntry::send(b, a, 16, 120, &vc(&[0, 1])));
        l1.record(LogEntry::term_recv(b, 120, &vc(&[0, 2])));
        l1.record(LogEntry::term_send(b, a, 130, &vc(&[0, 2])));
        vec![l0, l1]
    }

    #[test]
    fn clean_run_has_no_violations() {
        // Node 1 also sent once, so node 0 must have received it.
        let mut logs = clean_logs();
        let (a, b) = (NodeId(0), NodeId(1));
        let mut l0 = EventLog::new(a);
        for e in logs[0].entries().iter().take(2) {
            l0.record(e.clone());
        }
        l0.record(LogEntry::recv(a, b, 220, &vc(&[1, 1])));
        l0.record(LogEntry::term_recv(a, 230, &vc(&[2, 1])));
        logs[0] = l0;

        let report = audit(&logs, &pair(), 1);
        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.messages_matched, 2);
        assert_eq!(report.entries_checked, 8);
    }

    #[test]
    fn missing_receive_is_unmatched() {
        let report = audit(&clean_logs(), &pair(), 1);
        assert!(report.violations.contains(&Violation::Unmatched {
            from: NodeId(1),
            to: NodeId(0),
            sends: 1,
            recvs: 0,
        }));
    }

    #[test]
    fn skipped_increment_is_reported() {
        let a = NodeId(0);
        let mut log = EventLog::new(a);
        log.record(LogEntry::tick(a, 1, &vc(&[0, 0])));
        log.record(LogEntry::tick(a, 2, &vc(&[0, 0])));
        let report = audit(&[log], &Topology::new(2, &[]).unwrap(), 0);
        assert!(report.violations.contains(&Violation::OwnClockStep {
            node: a,
            index: 1,
            expected: 1,
            found: 0,
        }));
    }

    #[test]
    fn termination_entries_do_not_advance_own_component() {
        let a = NodeId(0);
        let mut log = EventLog::new(a);
        log.record(LogEntry::term_recv(a, 1, &vc(&[0, 0])));
        log.record(LogEntry::term_send(a, NodeId(1), 2, &vc(&[1, 0])));
        let report = audit(&[log], &pair(), 0);
        assert!(report.violations.contains(&Violation::OwnClockStep {
            node: a,
            index: 1,
            expected: 0,
            found: 1,
        }));
    }

    #[test]
    fn receive_that_forgets_sender_history_breaks_causality() {
        let (a, b) = (NodeId(0), NodeId(1));
        let mut l0 = EventLog::new(a);
        l0.record(LogEntry::tick(a, 1, &vc(&[0, 0])));
        l0.record(LogEntry::send(a, b, 16, 2, &vc(&[1, 0])));
        let mut l1 = EventLog::new(b);
        l1.record(LogEntry::recv(b, a, 3, &vc(&[0, 0])));
        let report = audit(&[l0, l1], &pair(), 1);
        assert!(report.violations.contains(&Violation::CausalityBroken {
            from: a,
            to: b,
            message: 0,
        }));
    }

    #[test]
    fn marker_before_send_is_reported() {
        let (a, b) = (NodeId(0), NodeId(1));
        let mut log = EventLog::new(a);
        log.record(LogEntry::term_send(a, b, 1, &vc(&[0, 0])));
        log.record(LogEntry::send(a, b, 16, 2, &vc(&[0, 0])));
        let report = audit(&[log], &pair(), 1);
        assert!(report
            .violations
            .contains(&Violation::MarkerBeforeSend { node: a }));
    }
}
