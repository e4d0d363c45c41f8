//! CRC-32 checksum codec for the delimited wire format.
//!
//! Every datagram ends in a checksum field computed over **everything before
//! it**, including the trailing field delimiter:
//!
//! ```text
//! type|sequence|payload|checksum
//! ^^^^^^^^^^^^^^^^^^^^^^ <- checksummed region (note the trailing '|')
//! ```
//!
//! The checksum is the IEEE CRC-32 of those bytes, written on the wire as an
//! unsigned base-10 decimal string.  No I/O happens here — both functions are
//! pure.

/// Field delimiter used throughout the wire format.
pub const DELIMITER: u8 = b'|';

/// Compute the checksum over `body` and render it as a decimal string.
///
/// `body` must be the full packet text up to and including the delimiter that
/// precedes the checksum field.
pub fn generate(body: &[u8]) -> String {
    crc32fast::hash(body).to_string()
}

/// Verify the trailing checksum field of a complete datagram.
///
/// Splits on the **last** delimiter, recomputes the checksum over everything
/// up to and including that delimiter, and compares it with the reported
/// value.  A datagram with no delimiter at all fails validation.
pub fn validate(datagram: &[u8]) -> bool {
    let Some(split) = datagram.iter().rposition(|&b| b == DELIMITER) else {
        return false;
    };
    let (body, reported) = datagram.split_at(split + 1);
    generate(body).as_bytes() == reported
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_is_deterministic() {
        let a = generate(b"data|3|aGVsbG8=|");
        let b = generate(b"data|3|aGVsbG8=|");
        assert_eq!(a, b);
    }

    #[test]
    fn generate_is_decimal_text() {
        let sum = generate(b"start|0||");
        assert!(!sum.is_empty());
        assert!(sum.bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn validate_accepts_own_output() {
        let body = b"ack|5||";
        let mut datagram = body.to_vec();
        datagram.extend_from_slice(generate(body).as_bytes());
        assert!(validate(&datagram));
    }

    #[test]
    fn validate_rejects_tampered_body() {
        let body = b"data|1|cGF5bG9hZA==|";
        let mut datagram = body.to_vec();
        datagram.extend_from_slice(generate(body).as_bytes());
        datagram[0] = b'e'; // "data" -> "eata"
        assert!(!validate(&datagram));
    }

    #[test]
    fn validate_rejects_tampered_checksum() {
        let body = b"end|9||";
        let mut datagram = body.to_vec();
        datagram.extend_from_slice(generate(body).as_bytes());
        let last = datagram.len() - 1;
        // Flip the final digit to a different one.
        datagram[last] = if datagram[last] == b'0' { b'1' } else { b'0' };
        assert!(!validate(&datagram));
    }

    #[test]
    fn validate_rejects_delimiterless_input() {
        assert!(!validate(b"no delimiter here"));
        assert!(!validate(b""));
    }
}
