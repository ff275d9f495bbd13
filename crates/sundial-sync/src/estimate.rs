//! Offset and round-trip estimation
//!
//! Pure computation over the four exchange timestamps:
//! - T0: client send, T1: server receive, T2: server send, T3: client receive

use sundial_core::{NtpInstant, SundialError, SundialResult};

/// One measured clock-offset sample.
///
/// `rtt_micros` is kept signed: under well-behaved network conditions it is
/// non-negative by construction, so a negative value signals a corrupted
/// exchange and must never drive a correction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffsetSample {
    /// Signed local-clock error in microseconds (positive: local is behind).
    pub offset_micros: i64,
    /// Round-trip delay net of server processing time, in microseconds.
    pub rtt_micros: i64,
}

impl OffsetSample {
    /// Compute offset and RTT from an exchange.
    pub fn from_exchange(t0: NtpInstant, t1: NtpInstant, t2: NtpInstant, t3: NtpInstant) -> Self {
        let offset_micros = (t1.micros_since(t0) + t2.micros_since(t3)) / 2;
        let rtt_micros = t3.micros_since(t0) - t2.micros_since(t1);
        OffsetSample {
            offset_micros,
            rtt_micros,
        }
    }

    /// Trust gate for applying a correction: the RTT must be non-negative and
    /// below the sanity bound, unless the server advertises a precision
    /// better than `precision_floor_secs`.
    pub fn check_trusted(
        &self,
        rtt_bound_micros: i64,
        precision_secs: f64,
        precision_floor_secs: f64,
    ) -> SundialResult<()> {
        if self.rtt_micros < 0 {
            return Err(SundialError::UntrustedSample {
                rtt_micros: self.rtt_micros,
            });
        }
        if self.rtt_micros < rtt_bound_micros || precision_secs < precision_floor_secs {
            Ok(())
        } else {
            Err(SundialError::UntrustedSample {
                rtt_micros: self.rtt_micros,
            })
        }
    }
}
