//! Binary encode/decode for clock payloads.
//!
//! All integers are little-endian `u32`. There is no header and no length
//! prefix: the layout is implied by the algorithm and the payload length.
//!
//! ```text
//! naive:       [c0] [c1] ... [c(n-1)] [sender]
//! sk:          [j0 v0] [j1 v1] ... [j(k-1) v(k-1)] [sender 0]
//! termination: (empty)
//! ```

use smallvec::SmallVec;

use causim_core::{NodeId, VectorClock, WireError};

/// Raw bytes carried by a channel.
pub type Payload = Vec<u8>;

/// Width of one encoded integer.
pub const WORD: usize = 4;

/// Width of one encoded `(index, value)` pair.
pub const PAIR: usize = 2 * WORD;

/// Delta entries stay inline up to this count.
pub type DeltaEntries = SmallVec<[(u32, u32); 8]>;

/// A termination marker is the empty payload.
#[inline]
pub fn is_termination(payload: &[u8]) -> bool {
    payload.is_empty()
}

/// Append a little-endian u32.
#[inline]
pub fn write_u32_le(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn words(payload: &[u8]) -> impl Iterator<Item = u32> + '_ {
    payload
        .chunks_exact(WORD)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
}

fn check_index(index: u32, node_count: usize) -> Result<(), WireError> {
    if (index as usize) < node_count {
        Ok(())
    } else {
        Err(WireError::IndexOutOfRange { index, node_count })
    }
}

// ── Full vector ─────────────────────────────────────────────────

/// A decoded naive payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FullVector {
    /// The sender's clock at send time.
    pub clock: VectorClock,
    /// Sender tag, used only for the receiver's log.
    pub sender: NodeId,
}

/// Encode `clock` followed by the sender tag.
pub fn encode_full(clock: &VectorClock, sender: NodeId) -> Payload {
    let mut buf = Vec::with_capacity((clock.len() + 1) * WORD);
    for &c in clock.as_slice() {
        write_u32_le(&mut buf, c);
    }
    write_u32_le(&mut buf, sender.0);
    buf
}

/// Decode a naive payload for a clock of width `node_count`.
pub fn decode_full(payload: &[u8], node_count: usize) -> Result<FullVector, WireError> {
    let expected_len = (node_count + 1) * WORD;
    if payload.len() != expected_len {
        return Err(WireError::BadLength {
            len: payload.len(),
            expected: format!("{expected_len} ({node_count} components + sender)"),
        });
    }
    let values: SmallVec<[u32; 17]> = words(payload).collect();
    let (components, tag) = values.split_at(node_count);
    let sender = tag[0];
    check_index(sender, node_count)?;
    Ok(FullVector {
        clock: VectorClock::from_components(components),
        sender: NodeId(sender),
    })
}

// ── Delta ───────────────────────────────────────────────────────

/// A decoded SK payload: the delta entries and the trailing sentinel's sender.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delta {
    /// `(component index, value)` pairs, in ascending index order as sent.
    pub entries: DeltaEntries,
    /// Sender id taken from the `(sender, 0)` sentinel.
    pub sender: NodeId,
}

/// Encode `entries` followed by the `(sender, 0)` sentinel.
pub fn encode_delta(entries: &[(u32, u32)], sender: NodeId) -> Payload {
    let mut buf = Vec::with_capacity((entries.len() + 1) * PAIR);
    for &(index, value) in entries {
        write_u32_le(&mut buf, index);
        write_u32_le(&mut buf, value);
    }
    write_u32_le(&mut buf, sender.0);
    write_u32_le(&mut buf, 0);
    buf
}

/// Decode an SK payload for a clock of width `node_count`.
pub fn decode_delta(payload: &[u8], node_count: usize) -> Result<Delta, WireError> {
    if payload.len() < PAIR || payload.len() % PAIR != 0 {
        return Err(WireError::BadLength {
            len: payload.len(),
            expected: format!("a non-zero multiple of {PAIR}"),
        });
    }
    let mut values = words(payload);
    let pair_count = payload.len() / PAIR - 1;
    let mut entries = DeltaEntries::with_capacity(pair_count);
    for _ in 0..pair_count {
        if let (Some(index), Some(value)) = (values.next(), values.next()) {
            check_index(index, node_count)?;
            entries.push((index, value));
        }
    }
    let sender = values.next().unwrap_or(u32::MAX);
    check_index(sender, node_count)?;
    Ok(Delta {
        entries,
        sender: NodeId(sender),
    })
}
