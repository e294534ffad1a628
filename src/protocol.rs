//! Wire framing for the collector connection
//!
//! Every frame on the wire is a fixed 22-byte ASCII header followed by the
//! raw encoded payload:
//!
//! ```text
//! byte 0:      'b'
//! bytes 1-7:   payload length, decimal, zero-padded to 7 digits
//! bytes 8-20:  relative timestamp in seconds, 6 fractional digits,
//!              zero-padded to 13 characters (a minus sign occupies one
//!              of the 13 columns)
//! byte 21:     'e'
//! bytes 22..:  payload
//! ```
//!
//! The collector validates the `b`/`e` markers before trusting the fields,
//! so a desynchronized stream fails fast instead of mis-reading a length.

use crate::constants::{FRAME_HEADER_SIZE, MAX_PAYLOAD_SIZE};
use crate::error::NetworkError;

/// Decoded view of a wire frame header
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameHeader {
    /// Payload length in bytes
    pub length: usize,
    /// Relative timestamp in seconds
    pub timestamp: f64,
}

/// Encode a frame header for a payload of `length` bytes captured at
/// `timestamp` seconds relative to the sync epoch.
///
/// Fails if the length does not fit the 7-digit field or the timestamp
/// cannot be rendered in 13 characters.
pub fn encode_header(length: usize, timestamp: f64) -> Result<[u8; FRAME_HEADER_SIZE], NetworkError> {
    if length > MAX_PAYLOAD_SIZE {
        return Err(NetworkError::PayloadTooLarge(length));
    }
    if !timestamp.is_finite() {
        return Err(NetworkError::TimestampOutOfRange(timestamp));
    }

    let ts_field = format!("{:0>13}", format!("{:.6}", timestamp));
    if ts_field.len() != 13 {
        // |timestamp| >= 10^6 seconds does not fit the fixed-width field
        return Err(NetworkError::TimestampOutOfRange(timestamp));
    }

    let mut header = [0u8; FRAME_HEADER_SIZE];
    header[0] = b'b';
    header[1..8].copy_from_slice(format!("{:07}", length).as_bytes());
    header[8..21].copy_from_slice(ts_field.as_bytes());
    header[21] = b'e';
    Ok(header)
}

/// Parse a 22-byte frame header
pub fn parse_header(header: &[u8]) -> Result<FrameHeader, NetworkError> {
    if header.len() != FRAME_HEADER_SIZE || header[0] != b'b' || header[21] != b'e' {
        return Err(NetworkError::InvalidHeader);
    }

    let length_str = std::str::from_utf8(&header[1..8]).map_err(|_| NetworkError::InvalidHeader)?;
    if !length_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(NetworkError::InvalidHeader);
    }
    let length: usize = length_str.parse().map_err(|_| NetworkError::InvalidHeader)?;

    let ts_str = std::str::from_utf8(&header[8..21]).map_err(|_| NetworkError::InvalidHeader)?;
    let timestamp = parse_timestamp_field(ts_str)?;

    Ok(FrameHeader { length, timestamp })
}

/// Parse the zero-padded timestamp field, handling the negative case where
/// the padding sits in front of the sign (e.g. `0000-3.500000`).
fn parse_timestamp_field(field: &str) -> Result<f64, NetworkError> {
    let value = match field.find('-') {
        Some(pos) => {
            let (pad, number) = field.split_at(pos);
            if !pad.bytes().all(|b| b == b'0') {
                return Err(NetworkError::InvalidHeader);
            }
            number
        }
        None => field,
    };
    value.parse().map_err(|_| NetworkError::InvalidHeader)
}
