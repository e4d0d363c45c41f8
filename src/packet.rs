//! Wire-format definitions for protocol datagrams.
//!
//! Every datagram exchanged between peers is a [`Packet`].  This module is
//! responsible for:
//! - Defining the on-wire delimited layout.
//! - Serialising a [`Packet`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Packet`], returning errors
//!   for malformed, corrupt, or truncated input.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! UTF-8 text, four `|`-delimited fields:
//!
//! ```text
//! type|sequence|payload|checksum
//! ```
//!
//! - `type` is one of `start`, `data`, `end`, `ack`, `sack`.
//! - `sequence` is a base-10 fragment index.  For `sack` the slot instead
//!   carries `boundary;idx,idx,...` (an empty extra set is written `boundary;`).
//! - `payload` is the fragment's bytes, base64-encoded before framing so a raw
//!   `|` byte in user data can never corrupt field splitting.  Empty for
//!   control packets.
//! - `checksum` is the decimal CRC-32 over every preceding byte including the
//!   third delimiter (see [`crate::checksum`]).
//!
//! Decoding validates the checksum **before** trusting any field; a datagram
//! that fails any check comes back as a [`PacketError`], which callers on the
//! hot path discard silently.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;

use crate::checksum;

/// Position of a data fragment within the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// First fragment of the stream.
    Start,
    /// Interior fragment.
    Data,
    /// Final fragment (always distinct from `Start`, see [`crate::fragment`]).
    End,
}

impl DataKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Data => "data",
            Self::End => "end",
        }
    }
}

/// A complete protocol datagram, sender- or receiver-originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// A payload-carrying fragment from the sender.
    Data {
        kind: DataKind,
        seq: u64,
        payload: Vec<u8>,
    },
    /// Cumulative acknowledgement: all fragments with index < `next` received.
    Ack { next: u64 },
    /// Selective acknowledgement: cumulative boundary plus the explicit set of
    /// out-of-order indices the receiver is holding.
    Sack { next: u64, seen: Vec<u64> },
}

impl Packet {
    /// Serialise this packet into a newly allocated byte vector, computing the
    /// trailing checksum field last.
    pub fn encode(&self) -> Vec<u8> {
        let body = match self {
            Self::Data { kind, seq, payload } => {
                format!("{}|{}|{}|", kind.as_str(), seq, BASE64.encode(payload))
            }
            Self::Ack { next } => format!("ack|{next}||"),
            Self::Sack { next, seen } => {
                let extras = seen
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                format!("sack|{next};{extras}||")
            }
        };
        let mut buf = body.into_bytes();
        let sum = checksum::generate(&buf);
        buf.extend_from_slice(sum.as_bytes());
        buf
    }

    /// Parse a [`Packet`] from a raw datagram.
    ///
    /// The checksum is verified first; no field of a corrupt datagram is ever
    /// interpreted.  Returns [`Err`] if:
    /// - the datagram is not UTF-8 text,
    /// - the checksum does not verify,
    /// - the field count is not exactly four,
    /// - the type is unknown, or
    /// - a sequence / boundary / extra-ack field is non-numeric.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let text = std::str::from_utf8(buf).map_err(|_| PacketError::NotText)?;

        if !checksum::validate(buf) {
            return Err(PacketError::ChecksumMismatch);
        }

        let fields: Vec<&str> = text.split('|').collect();
        let [kind, seq_field, payload_field, _checksum] = fields[..] else {
            return Err(PacketError::FieldCount(fields.len()));
        };

        match kind {
            "start" | "data" | "end" => {
                let kind = match kind {
                    "start" => DataKind::Start,
                    "end" => DataKind::End,
                    _ => DataKind::Data,
                };
                let seq = parse_index(seq_field)?;
                let payload = BASE64
                    .decode(payload_field)
                    .map_err(|_| PacketError::BadPayload)?;
                Ok(Self::Data { kind, seq, payload })
            }
            "ack" => Ok(Self::Ack {
                next: parse_index(seq_field)?,
            }),
            "sack" => {
                // `boundary;idx,idx,...` — the extra set may be empty.
                let (boundary, extras) = seq_field.split_once(';').unwrap_or((seq_field, ""));
                let next = parse_index(boundary)?;
                let seen = if extras.is_empty() {
                    Vec::new()
                } else {
                    extras
                        .split(',')
                        .map(parse_index)
                        .collect::<Result<_, _>>()?
                };
                Ok(Self::Sack { next, seen })
            }
            other => Err(PacketError::UnknownType(other.to_owned())),
        }
    }
}

fn parse_index(field: &str) -> Result<u64, PacketError> {
    field
        .parse::<u64>()
        .map_err(|_| PacketError::BadSequence(field.to_owned()))
}

/// Errors that can arise when parsing a raw datagram.
///
/// All variants mean the same thing to the transfer loop — "drop this
/// datagram" — but distinguishing them keeps logs useful.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// Datagram is not valid UTF-8.
    #[error("datagram is not UTF-8 text")]
    NotText,
    /// Reported checksum does not match the recomputed value.
    #[error("checksum verification failed")]
    ChecksumMismatch,
    /// Datagram does not split into exactly four fields.
    #[error("expected 4 fields, found {0}")]
    FieldCount(usize),
    /// Unrecognised type field.
    #[error("unknown packet type {0:?}")]
    UnknownType(String),
    /// Sequence, boundary, or extra-ack field is not a non-negative integer.
    #[error("non-numeric sequence field {0:?}")]
    BadSequence(String),
    /// Payload field is not valid base64.
    #[error("payload field is not valid base64")]
    BadPayload,
}
