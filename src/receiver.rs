//! Receiver-side transport driver and reassembly state machine.
//!
//! The receiver is the peer whose acknowledgement semantics the sender
//! interprets.  It accepts data packets, reassembles the payload in order,
//! and answers every data packet with the acknowledgement the configured mode
//! calls for:
//!
//! - **Cumulative**: only the exactly-next fragment is accepted; anything
//!   out-of-order or duplicate is discarded, and the reply is `ack|next` with
//!   the next expected index.
//! - **Selective**: out-of-order fragments are buffered, contiguous runs are
//!   drained as they complete, and the reply is `sack|next;i,j,...` carrying
//!   both the cumulative boundary and the buffered out-of-order set.
//!
//! Corrupt or malformed datagrams are dropped without a reply, which is what
//! eventually drives the sender's timeout path.  [`Reassembly`] holds the
//! pure state machine; [`Receiver`] adds the socket loop around it.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use crate::packet::{DataKind, Packet};
use crate::sender::TransportError;
use crate::socket::UdpEndpoint;
use crate::window::AckMode;

/// How long to keep answering retransmissions after the transfer completes.
///
/// Covers the case where the final acknowledgement is lost: the sender will
/// retransmit the tail of the window and needs one more ack to finish.
pub const DEFAULT_LINGER: Duration = Duration::from_secs(2);

/// Pure reassembly state for one inbound transfer.
#[derive(Debug)]
pub struct Reassembly {
    mode: AckMode,
    /// Next expected fragment index (the cumulative boundary we advertise).
    next: u64,
    /// In-order payload accepted so far.
    assembled: Vec<u8>,
    /// Out-of-order fragments held back (selective mode only).
    pending: BTreeMap<u64, Vec<u8>>,
    /// Index of the `end` fragment, once seen.
    end_seq: Option<u64>,
}

impl Reassembly {
    pub fn new(mode: AckMode) -> Self {
        Self {
            mode,
            next: 0,
            assembled: Vec::new(),
            pending: BTreeMap::new(),
            end_seq: None,
        }
    }

    /// Next expected fragment index.
    pub fn next_expected(&self) -> u64 {
        self.next
    }

    /// `true` once every fragment up to and including `end` has been accepted.
    pub fn is_complete(&self) -> bool {
        self.end_seq.is_some_and(|end| self.next > end)
    }

    /// Process one data fragment and return the acknowledgement to send back.
    pub fn on_data(&mut self, kind: DataKind, seq: u64, payload: &[u8]) -> Packet {
        if kind == DataKind::End {
            self.end_seq = Some(seq);
        }

        if seq == self.next {
            self.assembled.extend_from_slice(payload);
            self.next += 1;
            // Drain any buffered run that is now contiguous.
            while let Some(run) = self.pending.remove(&self.next) {
                self.assembled.extend_from_slice(&run);
                self.next += 1;
            }
        } else if seq > self.next {
            match self.mode {
                // Cumulative receivers do not buffer out-of-order data.
                AckMode::Cumulative => {}
                AckMode::Selective => {
                    self.pending.entry(seq).or_insert_with(|| payload.to_vec());
                }
            }
        }
        // seq < next: duplicate of already-accepted data; just re-ack.

        self.ack()
    }

    /// The acknowledgement reflecting the current state.
    pub fn ack(&self) -> Packet {
        match self.mode {
            AckMode::Cumulative => Packet::Ack { next: self.next },
            AckMode::Selective => Packet::Sack {
                next: self.next,
                seen: self.pending.keys().copied().collect(),
            },
        }
    }

    /// Consume the reassembly and return the in-order payload.
    pub fn into_assembled(self) -> Vec<u8> {
        self.assembled
    }
}

/// Tunable parameters for one inbound transfer.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Local address to bind (the port the sender targets).
    pub bind: SocketAddr,
    /// Acknowledgement mode; must match the sender's.
    pub mode: AckMode,
    /// Quiet period to keep re-acking after completion.
    pub linger: Duration,
}

impl ReceiverConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self {
            bind,
            mode: AckMode::Cumulative,
            linger: DEFAULT_LINGER,
        }
    }
}

/// One inbound file transfer bound to a local UDP endpoint.
pub struct Receiver {
    socket: UdpEndpoint,
    config: ReceiverConfig,
}

impl Receiver {
    /// Bind the local endpoint the sender will target.
    pub async fn bind(config: ReceiverConfig) -> Result<Self, TransportError> {
        let socket = UdpEndpoint::bind(config.bind).await?;
        Ok(Self { socket, config })
    }

    /// Local address of the underlying endpoint.
    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    /// Accept one complete transfer and return the reassembled bytes.
    ///
    /// Blocks until the whole fragment sequence has arrived, then lingers
    /// briefly to re-ack any retransmitted tail before returning.
    pub async fn run(&self) -> Result<Vec<u8>, TransportError> {
        let mut reassembly = Reassembly::new(self.config.mode);
        let mut peer: Option<SocketAddr> = None;

        log::info!(
            "[receiver] listening on {} (mode={:?})",
            self.socket.local_addr,
            self.config.mode,
        );

        while !reassembly.is_complete() {
            // No deadline mid-transfer: the sender retransmits until we ack.
            let Some((datagram, from)) = self
                .socket
                .recv_timeout(Duration::from_secs(3600))
                .await?
            else {
                continue;
            };

            // Lock on to the first peer; ignore interlopers.
            let peer = *peer.get_or_insert(from);
            if from != peer {
                log::debug!("[receiver] ignoring datagram from foreign peer {from}");
                continue;
            }

            match Packet::decode(&datagram) {
                Ok(Packet::Data { kind, seq, payload }) => {
                    let reply = reassembly.on_data(kind, seq, &payload);
                    log::debug!(
                        "[receiver] data seq={seq} ({kind:?}, {} bytes); reply {reply:?}",
                        payload.len()
                    );
                    self.socket.send_to(&reply.encode(), peer).await?;
                }
                Ok(other) => {
                    log::debug!("[receiver] ignoring non-data packet {other:?}");
                }
                Err(e) => {
                    // No reply: silence is what triggers the sender's timeout.
                    log::debug!("[receiver] dropping datagram: {e}");
                }
            }
        }

        // Keep answering retransmissions until the sender goes quiet, in case
        // our final acknowledgement was lost.
        let final_ack = reassembly.ack().encode();
        if let Some(peer) = peer {
            while let Some((datagram, from)) = self.socket.recv_timeout(self.config.linger).await? {
                if from == peer && Packet::decode(&datagram).is_ok() {
                    self.socket.send_to(&final_ack, peer).await?;
                }
            }
        }

        let assembled = reassembly.into_assembled();
        log::info!("[receiver] transfer complete: {} bytes", assembled.len());
        Ok(assembled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_fragments_assemble() {
        let mut r = Reassembly::new(AckMode::Cumulative);

        assert_eq!(
            r.on_data(DataKind::Start, 0, b"ab"),
            Packet::Ack { next: 1 }
        );
        assert_eq!(r.on_data(DataKind::Data, 1, b"cd"), Packet::Ack { next: 2 });
        assert_eq!(r.on_data(DataKind::End, 2, b"e"), Packet::Ack { next: 3 });

        assert!(r.is_complete());
        assert_eq!(r.into_assembled(), b"abcde");
    }

    #[test]
    fn cumulative_discards_out_of_order() {
        let mut r = Reassembly::new(AckMode::Cumulative);
        r.on_data(DataKind::Start, 0, b"a");

        // Gap: fragment 1 missing.  Fragment 2 must not be buffered.
        assert_eq!(r.on_data(DataKind::Data, 2, b"c"), Packet::Ack { next: 1 });

        r.on_data(DataKind::Data, 1, b"b");
        // Fragment 2 was dropped, so the boundary stops at 2.
        assert_eq!(r.next_expected(), 2);
        assert_eq!(r.into_assembled(), b"ab");
    }

    #[test]
    fn selective_buffers_and_reports_out_of_order() {
        let mut r = Reassembly::new(AckMode::Selective);
        r.on_data(DataKind::Start, 0, b"a");

        let reply = r.on_data(DataKind::Data, 3, b"d");
        assert_eq!(
            reply,
            Packet::Sack {
                next: 1,
                seen: vec![3]
            }
        );

        let reply = r.on_data(DataKind::Data, 2, b"c");
        assert_eq!(
            reply,
            Packet::Sack {
                next: 1,
                seen: vec![2, 3]
            }
        );

        // The missing fragment arrives; the buffered run drains.
        let reply = r.on_data(DataKind::Data, 1, b"b");
        assert_eq!(
            reply,
            Packet::Sack {
                next: 4,
                seen: vec![]
            }
        );
        assert_eq!(r.into_assembled(), b"abcd");
    }

    #[test]
    fn duplicate_fragment_is_reacked_not_reapplied() {
        let mut r = Reassembly::new(AckMode::Cumulative);
        r.on_data(DataKind::Start, 0, b"xy");

        let reply = r.on_data(DataKind::Start, 0, b"xy");
        assert_eq!(reply, Packet::Ack { next: 1 });
        assert_eq!(r.into_assembled(), b"xy");
    }

    #[test]
    fn complete_only_after_contiguous_end() {
        let mut r = Reassembly::new(AckMode::Selective);
        r.on_data(DataKind::Start, 0, b"a");
        r.on_data(DataKind::End, 2, b"c");
        // End seen but fragment 1 still missing.
        assert!(!r.is_complete());

        r.on_data(DataKind::Data, 1, b"b");
        assert!(r.is_complete());
    }

    #[test]
    fn empty_transfer_completes_after_two_fragments() {
        let mut r = Reassembly::new(AckMode::Cumulative);
        r.on_data(DataKind::Start, 0, b"");
        assert!(!r.is_complete());
        r.on_data(DataKind::End, 1, b"");
        assert!(r.is_complete());
        assert!(r.into_assembled().is_empty());
    }
}
