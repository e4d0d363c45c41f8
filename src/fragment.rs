//! Fragmentation of the source stream into bounded, position-tagged pieces.
//!
//! The whole source is split **once** at start-up into an ordered, immutable
//! sequence of fragments of at most `max_payload` bytes.  Fragment 0 is tagged
//! [`DataKind::Start`], the last [`DataKind::End`], everything between
//! [`DataKind::Data`].  When the split would yield a single fragment (including
//! the empty-input case) a synthetic empty `end` fragment is appended so the
//! `start` and `end` markers are never the same packet.
//!
//! The resulting sequence is owned by the sender for the lifetime of the
//! transfer and never mutated after generation.

use crate::packet::{DataKind, Packet};

/// Default maximum payload size per fragment, in bytes (pre-base64).
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

/// One bounded-size slice of the source, tagged with its transfer position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: DataKind,
    pub seq: u64,
    pub payload: Vec<u8>,
}

impl Fragment {
    /// Build the wire packet for this fragment.
    pub fn to_packet(&self) -> Packet {
        Packet::Data {
            kind: self.kind,
            seq: self.seq,
            payload: self.payload.clone(),
        }
    }
}

/// Split `source` into the full fragment sequence for one transfer.
///
/// Infallible: every input, including the empty one, yields at least a
/// `start` fragment and an `end` fragment.
///
/// # Panics
///
/// Panics if `max_payload` is zero.
pub fn split(source: &[u8], max_payload: usize) -> Vec<Fragment> {
    assert!(max_payload >= 1, "max_payload must be at least 1");

    let mut payloads: Vec<Vec<u8>> = source.chunks(max_payload).map(<[u8]>::to_vec).collect();
    if payloads.len() < 2 {
        // Single (or no) chunk: add the synthetic empty trailing fragment so
        // `start` and `end` are distinct packets.
        payloads.resize(2, Vec::new());
    }

    let last = payloads.len() - 1;
    payloads
        .into_iter()
        .enumerate()
        .map(|(i, payload)| Fragment {
            kind: match i {
                0 => DataKind::Start,
                i if i == last => DataKind::End,
                _ => DataKind::Data,
            },
            seq: i as u64,
            payload,
        })
        .collect()
}
