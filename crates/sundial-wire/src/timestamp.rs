//! Fixed-point wire timestamps
//!
//! On the wire a timestamp is 8 bytes, big-endian: 32 bits of whole seconds
//! since the NTP era, then 32 bits of binary fractional seconds. Locally the
//! engine works in decimal microseconds, so encode/decode is a fixed-point
//! base conversion. The fraction loses at most 1 microsecond per round trip.

use sundial_core::{NtpInstant, MICROS_PER_SEC};

/// Wire size of one timestamp.
pub const TIMESTAMP_SIZE: usize = 8;

/// Encode a microsecond instant into the 8-byte wire form.
pub fn encode_timestamp(t: NtpInstant) -> [u8; TIMESTAMP_SIZE] {
    let micros = t.as_micros();
    let secs = (micros / MICROS_PER_SEC) as u32;
    // Decimal microseconds to binary fraction: (rem << 32) / 10^6 fits in u64.
    let frac = (((micros % MICROS_PER_SEC) << 32) / MICROS_PER_SEC) as u32;

    let mut buf = [0u8; TIMESTAMP_SIZE];
    buf[..4].copy_from_slice(&secs.to_be_bytes());
    buf[4..].copy_from_slice(&frac.to_be_bytes());
    buf
}

/// Decode the 8-byte wire form back to a microsecond instant.
///
/// All arithmetic is unsigned 64-bit; the fraction is never sign-extended.
pub fn decode_timestamp(buf: &[u8; TIMESTAMP_SIZE]) -> NtpInstant {
    let secs = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as u64;
    let frac = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]) as u64;
    NtpInstant::from_micros(secs * MICROS_PER_SEC + ((frac * MICROS_PER_SEC) >> 32))
}
