//! Time primitives for sundial
//!
//! The synchronization engine works in a single unit: microseconds since the
//! NTP era (1900-01-01 00:00:00 UTC). Conversions to Unix split time
//! (seconds + sub-second microseconds) happen only at the clock-store boundary.

use std::fmt;
use std::time::Duration;

/// Seconds between the NTP era (1900) and the Unix epoch (1970).
pub const NTP_UNIX_OFFSET_SECS: u64 = 2_208_988_800;

/// Microseconds per second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// An absolute instant, in microseconds since the NTP era.
///
/// This is the unit every exchange timestamp (T0..T3) is expressed in.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NtpInstant(pub u64);

impl NtpInstant {
    pub const ZERO: NtpInstant = NtpInstant(0);

    #[inline]
    pub fn from_micros(micros: u64) -> Self {
        NtpInstant(micros)
    }

    /// Build an instant from Unix split time.
    #[inline]
    pub fn from_unix(secs: u64, micros: u32) -> Self {
        NtpInstant((secs + NTP_UNIX_OFFSET_SECS) * MICROS_PER_SEC + micros as u64)
    }

    #[inline]
    pub fn as_micros(self) -> u64 {
        self.0
    }

    /// Whole seconds since the NTP era.
    #[inline]
    pub fn era_secs(self) -> u64 {
        self.0 / MICROS_PER_SEC
    }

    /// Sub-second microseconds.
    #[inline]
    pub fn subsec_micros(self) -> u32 {
        (self.0 % MICROS_PER_SEC) as u32
    }

    /// Split into Unix epoch seconds and sub-second microseconds.
    ///
    /// Instants before the Unix epoch saturate to (0, 0).
    #[inline]
    pub fn to_unix(self) -> (u64, u32) {
        let rel = self
            .0
            .saturating_sub(NTP_UNIX_OFFSET_SECS * MICROS_PER_SEC);
        (
            rel / MICROS_PER_SEC,
            (rel % MICROS_PER_SEC) as u32,
        )
    }

    /// Signed difference `self - other` in microseconds.
    #[inline]
    pub fn micros_since(self, other: NtpInstant) -> i64 {
        self.0 as i64 - other.0 as i64
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        NtpInstant(self.0.saturating_add(duration.as_micros() as u64))
    }

    /// Shift by a signed microsecond delta, saturating at zero.
    #[inline]
    pub fn offset_by(self, delta_micros: i64) -> Self {
        NtpInstant(self.0.saturating_add_signed(delta_micros))
    }
}

impl fmt::Debug for NtpInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ntp({}.{:06}s)", self.era_secs(), self.subsec_micros())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_roundtrip() {
        let t = NtpInstant::from_unix(1_700_000_000, 123_456);
        let (secs, micros) = t.to_unix();
        assert_eq!(secs, 1_700_000_000);
        assert_eq!(micros, 123_456);
    }

    #[test]
    fn test_era_offset() {
        // The Unix epoch itself is 2_208_988_800 s into the NTP era.
        let t = NtpInstant::from_unix(0, 0);
        assert_eq!(t.era_secs(), NTP_UNIX_OFFSET_SECS);
    }

    #[test]
    fn test_micros_since_signed() {
        let a = NtpInstant::from_micros(1_000);
        let b = NtpInstant::from_micros(1_500);
        assert_eq!(b.micros_since(a), 500);
        assert_eq!(a.micros_since(b), -500);
    }

    #[test]
    fn test_pre_epoch_saturates() {
        let t = NtpInstant::from_micros(5);
        assert_eq!(t.to_unix(), (0, 0));
    }

    #[test]
    fn test_offset_by() {
        let t = NtpInstant::from_micros(2_000_000);
        assert_eq!(t.offset_by(-500_000).as_micros(), 1_500_000);
        assert_eq!(t.offset_by(500_000).as_micros(), 2_500_000);
    }
}
