//! Sender-side transport driver.
//!
//! [`Sender::run`] is the event loop binding fragmentation, the sliding
//! window, and the socket:
//!
//! ```text
//!  split source into fragments (once)
//!       │
//!       ▼
//!  ┌─▶ send phase      transmit every eligible fragment, arm timers
//!  │   timeout phase   act on the first expired timer only (go-back-N)
//!  │   receive phase   block ≤ timeout for one datagram; interpret; apply
//!  └── until base == fragment count
//! ```
//!
//! The loop is a single logical task: window state is never touched
//! concurrently, and cancelling the future at any `await` point leaves no
//! half-applied state behind.  Per-packet faults (corrupt or malformed
//! inbound datagrams, stale acks) are absorbed by the lower layers; the loop
//! only ever observes "nothing happened this iteration" and goes round again.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::ack::{self, AckEvent};
use crate::fragment::{self, DEFAULT_MAX_PAYLOAD};
use crate::socket::{SocketError, UdpEndpoint};
use crate::window::{AckMode, AckOutcome, Window, DEFAULT_WINDOW_SIZE};

/// Default per-fragment retransmission timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Errors that can abort a transfer.
///
/// Note how short this list is: timeouts, corruption, and duplicate acks are
/// recovery signals handled inside the loop, not errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Fatal socket failure (bind or I/O).
    #[error(transparent)]
    Socket(#[from] SocketError),
}

/// Tunable parameters for one outbound transfer.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Destination endpoint.
    pub peer: SocketAddr,
    /// Maximum fragment payload size in bytes.
    pub max_payload: usize,
    /// Sliding-window size (N).
    pub window_size: usize,
    /// Retransmission timeout; also bounds the receive-phase wait.
    pub timeout: Duration,
    /// Cumulative or selective acknowledgement interpretation.
    pub mode: AckMode,
}

impl SenderConfig {
    /// Defaults matching the protocol constants: 1024-byte fragments,
    /// window of 5, 500 ms timeout, cumulative acks.
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            max_payload: DEFAULT_MAX_PAYLOAD,
            window_size: DEFAULT_WINDOW_SIZE,
            timeout: DEFAULT_TIMEOUT,
            mode: AckMode::Cumulative,
        }
    }
}

/// Counters reported after a completed transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferStats {
    /// Number of fragments the source split into.
    pub fragments: usize,
    /// First-time data transmissions.
    pub sends: u64,
    /// Repeat transmissions triggered by go-back-N.
    pub retransmits: u64,
    /// Acknowledgements that advanced the window.
    pub acks_applied: u64,
    /// Inbound datagrams dropped (corrupt, malformed, stale, or foreign).
    pub drops: u64,
}

/// One outbound file transfer over an owned UDP endpoint.
pub struct Sender {
    socket: UdpEndpoint,
    config: SenderConfig,
}

impl Sender {
    /// Bind an ephemeral local endpoint for a transfer to `config.peer`.
    pub async fn bind(config: SenderConfig) -> Result<Self, TransportError> {
        let local = match config.peer {
            SocketAddr::V4(_) => SocketAddr::new(std::net::Ipv4Addr::UNSPECIFIED.into(), 0),
            SocketAddr::V6(_) => SocketAddr::new(std::net::Ipv6Addr::UNSPECIFIED.into(), 0),
        };
        let socket = UdpEndpoint::bind(local).await?;
        Ok(Self { socket, config })
    }

    /// Build a sender around an already-bound endpoint (used by tests).
    pub fn from_endpoint(socket: UdpEndpoint, config: SenderConfig) -> Self {
        Self { socket, config }
    }

    /// Local address of the underlying endpoint.
    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    /// Transfer `source` to the peer, blocking until every fragment is
    /// acknowledged.
    ///
    /// Runs the send / timeout / receive loop described in the module docs.
    /// Returns only on completion or on a fatal socket error.
    pub async fn run(&self, source: &[u8]) -> Result<TransferStats, TransportError> {
        let cfg = &self.config;
        let fragments = fragment::split(source, cfg.max_payload);
        // Encode each fragment once; retransmissions reuse the same bytes.
        let wire: Vec<Vec<u8>> = fragments.iter().map(|f| f.to_packet().encode()).collect();

        let mut window = Window::new(fragments.len(), cfg.window_size, cfg.timeout, cfg.mode);
        let mut sent_before = vec![false; fragments.len()];
        let mut stats = TransferStats {
            fragments: fragments.len(),
            ..TransferStats::default()
        };

        log::info!(
            "[sender] transferring {} bytes as {} fragments to {} (window={}, timeout={:?}, mode={:?})",
            source.len(),
            fragments.len(),
            cfg.peer,
            cfg.window_size,
            cfg.timeout,
            cfg.mode,
        );

        while !window.is_complete() {
            // Send phase: everything currently eligible.
            while let Some(i) = window.next_eligible() {
                self.socket.send_to(&wire[i], cfg.peer).await?;
                window.record_sent(i, Instant::now());
                if sent_before[i] {
                    stats.retransmits += 1;
                    log::debug!("[sender] resend seq={i}");
                } else {
                    sent_before[i] = true;
                    stats.sends += 1;
                    log::debug!("[sender] send seq={i}");
                }
            }

            // Timeout phase: one expired timer per pass, lowest index first.
            if let Some(i) = window.first_expired(Instant::now()) {
                window.on_timeout(i);
            }

            // Receive phase: wait at most one timeout interval for an ack.
            match self.socket.recv_timeout(cfg.timeout).await? {
                Some((datagram, from)) if from == cfg.peer => {
                    match ack::interpret(&datagram) {
                        Some(event) => match window.apply(&event) {
                            AckOutcome::Advanced => {
                                stats.acks_applied += 1;
                                self.log_ack(&event, &window);
                            }
                            AckOutcome::Stale | AckOutcome::OutOfRange => stats.drops += 1,
                        },
                        None => stats.drops += 1,
                    }
                }
                Some((_, from)) => {
                    log::debug!("[sender] ignoring datagram from foreign peer {from}");
                    stats.drops += 1;
                }
                None => {
                    // Quiet interval; the timeout phase above catches real loss.
                }
            }
        }

        log::info!(
            "[sender] complete: {} sends, {} retransmits, {} acks",
            stats.sends,
            stats.retransmits,
            stats.acks_applied,
        );
        Ok(stats)
    }

    fn log_ack(&self, event: &AckEvent, window: &Window) {
        match event {
            AckEvent::Cumulative(v) => {
                log::debug!("[sender] ack {v}; base={}", window.base());
            }
            AckEvent::Selective { boundary, seen } => {
                log::debug!(
                    "[sender] sack {boundary};{seen:?}; base={}",
                    window.base()
                );
            }
        }
    }
}
