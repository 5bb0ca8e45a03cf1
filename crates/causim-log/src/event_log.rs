//! Append-only per-node log.

use causim_core::NodeId;

use crate::entry::{EventKind, LogEntry};

/// The log owned by one node for the lifetime of its worker.
///
/// Entries are stored in the order the node handled them, which is also
/// the node's local causal order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventLog {
    node: NodeId,
    entries: Vec<LogEntry>,
}

impl EventLog {
    /// An empty log for `node`.
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            entries: Vec::new(),
        }
    }

    /// Owning node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Append an entry.
    pub fn record(&mut self, entry: LogEntry) {
        debug_assert_eq!(entry.node, self.node, "entry logged by the wrong node");
        self.entries.push(entry);
    }

    /// All entries in handling order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent entry.
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Number of entries of `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Sum of payload sizes over all `Send` entries.
    pub fn payload_bytes_sent(&self) -> u64 {
        self.entries
            .iter()
            .filter(|e| e.kind == EventKind::Send)
            .map(|e| e.payload_bytes as u64)
            .sum()
    }

    /// Consume the log, returning its entries.
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use causim_core::VectorClock;

    #[test]
    fn counts_and_sums_sends() {
        let c = VectorClock::new(2);
        let mut log = EventLog::new(NodeId(0));
        log.record(LogEntry::tick(NodeId(0), 1, &c));
        log.record(LogEntry::send(NodeId(0), NodeId(1), 12, 2, &c));
        log.record(LogEntry::send(NodeId(0), NodeId(1), 24, 3, &c));
        log.record(LogEntry::term_send(NodeId(0), NodeId(1), 4, &c));

        assert_eq!(log.len(), 4);
        assert_eq!(log.count(EventKind::Send), 2);
        assert_eq!(log.count(EventKind::TermRecv), 0);
        assert_eq!(log.payload_bytes_sent(), 36);
        assert_eq!(log.last().map(|e| e.kind), Some(EventKind::TermSend));
    }

    #[test]
    fn new_log_is_empty() {
        let log = EventLog::new(NodeId(3));
        assert!(log.is_empty());
        assert_eq!(log.node(), NodeId(3));
        assert_eq!(log.payload_bytes_sent(), 0);
    }
}
