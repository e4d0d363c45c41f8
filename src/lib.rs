//! `rudp-transfer` — reliable sliding-window file transfer over UDP.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐  start/data/end  ┌──────────┐
//!  │  Sender  │─────────────────▶│ Receiver │
//!  └────┬─────┘                  └─────┬────┘
//!       │                              │
//!       │        ack / sack            │
//!       │◀─────────────────────────────┘
//!       │
//!  ┌────▼──────────────────────────────┐
//!  │             Window                │
//!  │  (base, next, timers, ack flags)  │
//!  └────┬──────────────────────────────┘
//!       │ raw UDP datagrams
//!  ┌────▼────────┐
//!  │ UdpEndpoint │  (thin async wrapper around tokio UdpSocket)
//!  └─────────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`checksum`]   — CRC-32 codec for the delimited wire format
//! - [`packet`]     — wire format (serialise / deserialise)
//! - [`fragment`]   — split the source into bounded, position-tagged pieces
//! - [`window`]     — sliding-window send state machine (the core)
//! - [`ack`]        — inbound acknowledgement interpretation
//! - [`sender`]     — outbound transfer driver loop
//! - [`receiver`]   — inbound reassembly and acknowledgement generation
//! - [`socket`]     — async UDP endpoint abstraction
//!
//! Reliability comes from per-fragment timeouts with go-back-N
//! retransmission; selective-acknowledgement mode narrows retransmission to
//! fragments the receiver has genuinely not seen.

pub mod ack;
pub mod checksum;
pub mod fragment;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod socket;
pub mod window;
