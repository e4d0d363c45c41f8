//! Acknowledgement interpretation for inbound control datagrams.
//!
//! The transfer loop hands every received datagram to [`interpret`], which
//! validates and classifies it into an [`AckEvent`] the window can apply.
//! Anything that is not a well-formed, checksum-valid `ack` or `sack` packet
//! is dropped here — `None` means "pretend it never arrived".  Loss recovery
//! then falls to the normal timeout path, so no per-packet fault ever
//! propagates to the loop.

use crate::packet::{Packet, PacketError};

/// An interpreted acknowledgement, ready to apply to the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckEvent {
    /// "Every fragment with index < value has been received."
    Cumulative(u64),
    /// Cumulative semantics at `boundary`, plus the explicit set of
    /// out-of-order indices the receiver is holding.
    Selective { boundary: u64, seen: Vec<u64> },
}

/// Classify a raw inbound datagram.
///
/// Returns `None` for checksum mismatches, malformed packets, and valid
/// packets of a non-acknowledgement type (a stray data packet echoed back,
/// for instance).  Drops are logged at debug level only.
pub fn interpret(datagram: &[u8]) -> Option<AckEvent> {
    match Packet::decode(datagram) {
        Ok(Packet::Ack { next }) => Some(AckEvent::Cumulative(next)),
        Ok(Packet::Sack { next, seen }) => Some(AckEvent::Selective {
            boundary: next,
            seen,
        }),
        Ok(other) => {
            log::debug!("[ack] dropping non-acknowledgement packet {other:?}");
            None
        }
        Err(PacketError::ChecksumMismatch) => {
            log::debug!("[ack] dropping datagram with bad checksum");
            None
        }
        Err(e) => {
            log::debug!("[ack] dropping malformed datagram: {e}");
            None
        }
    }
}
