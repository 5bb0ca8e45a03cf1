//! Global merge of per-node logs.

use std::fmt;
use std::io::{self, Write};

use causim_core::SimParams;

use crate::entry::LogEntry;
use crate::event_log::EventLog;

/// All entries of a finished run, in real-time order, plus the
/// message-overhead diagnostic.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedLog {
    entries: Vec<LogEntry>,
    total_payload_bytes: u64,
    average_payload_bytes: f64,
}

impl MergedLog {
    /// Merge the logs of every node.
    ///
    /// Logs are concatenated in the given order, then stable-sorted by
    /// `offset_us`, so entries with equal timestamps keep node order and,
    /// within a node, handling order. The average is
    /// `sum(Send payload bytes) / params.total_sends()`, or `0.0` when
    /// no sends were expected.
    pub fn merge(logs: Vec<EventLog>, params: &SimParams) -> Self {
        let total_payload_bytes: u64 = logs.iter().map(EventLog::payload_bytes_sent).sum();
        let expected_sends = params.total_sends();
        let average_payload_bytes = if expected_sends == 0 {
            0.0
        } else {
            total_payload_bytes as f64 / expected_sends as f64
        };

        let mut entries: Vec<LogEntry> = logs.into_iter().flat_map(EventLog::into_entries).collect();
        entries.sort_by_key(|e| e.offset_us);

        Self {
            entries,
            total_payload_bytes,
            average_payload_bytes,
        }
    }

    /// Entries sorted by wall-clock offset.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Sum of all `Send` payload sizes.
    pub fn total_payload_bytes(&self) -> u64 {
        self.total_payload_bytes
    }

    /// Average bytes per send event.
    pub fn average_payload_bytes(&self) -> f64 {
        self.average_payload_bytes
    }

    /// Whether timestamps are non-decreasing. Always true after `merge`.
    pub fn is_time_ordered(&self) -> bool {
        self.entries
            .windows(2)
            .all(|w| w[0].offset_us <= w[1].offset_us)
    }

    /// Write one line per entry to `w`.
    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        for entry in &self.entries {
            writeln!(w, "{entry}")?;
        }
        w.flush()
    }
}

impl fmt::Display for MergedLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causim_core::{NodeId, VectorClock};
    use proptest::prelude::*;

    fn params(send_quota: usize, node_count: usize) -> SimParams {
        SimParams {
            node_count,
            mean_interarrival_ms: 1.0,
            send_bias: 1.0,
            send_quota,
        }
    }

    fn log_with(node: u32, events: &[(u64, usize)]) -> EventLog {
        let id = NodeId(node);
        let c = VectorClock::new(2);
        let mut log = EventLog::new(id);
        for &(at, bytes) in events {
            if bytes == 0 {
                log.record(LogEntry::tick(id, at, &c));
            } else {
                log.record(LogEntry::send(id, NodeId(1 - node), bytes, at, &c));
            }
        }
        log
    }

    #[test]
    fn average_divides_by_quota_times_nodes() {
        let logs = vec![
            log_with(0, &[(1, 12), (5, 12), (6, 0)]),
            log_with(1, &[(2, 24), (3, 0), (4, 24)]),
        ];
        let merged = MergedLog::merge(logs, &params(2, 2));
        assert_eq!(merged.total_payload_bytes(), 72);
        assert!((merged.average_payload_bytes() - 18.0).abs() < 1e-12);
    }

    #[test]
    fn zero_quota_reports_zero_average() {
        let merged = MergedLog::merge(vec![log_with(0, &[(1, 0)])], &params(0, 1));
        assert_eq!(merged.average_payload_bytes(), 0.0);
    }

    #[test]
    fn sort_is_stable_across_equal_timestamps() {
        let logs = vec![log_with(0, &[(5, 0), (5, 8)]), log_with(1, &[(5, 16)])];
        let merged = MergedLog::merge(logs, &params(1, 2));
        let order: Vec<(u32, usize)> = merged
            .entries()
            .iter()
            .map(|e| (e.node.0, e.payload_bytes))
            .collect();
        assert_eq!(order, vec![(0, 0), (0, 8), (1, 16)]);
    }

    #[test]
    fn rendered_output_has_one_line_per_entry() {
        let logs = vec![log_with(0, &[(3, 0)]), log_with(1, &[(1, 8)])];
        let merged = MergedLog::merge(logs, &params(1, 2));
        let mut out = Vec::new();
        merged.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Process1 sends message m1_0"));
        assert!(lines[1].starts_with("Process0 executes internal event"));
        assert_eq!(text, merged.to_string());
    }

    proptest! {
        #[test]
        fn merged_log_is_time_ordered(
            a in proptest::collection::vec((0u64..1000, 0usize..3), 0..40),
            b in proptest::collection::vec((0u64..1000, 0usize..3), 0..40),
        ) {
            let total = a.len() + b.len();
            let logs = vec![log_with(0, &a), log_with(1, &b)];
            let merged = MergedLog::merge(logs, &params(1, 2));
            prop_assert_eq!(merged.entries().len(), total);
            prop_assert!(merged.is_time_ordered());
        }
    }
}
