//! Pure reply validation
//!
//! Decoupled from clock application so it can be tested without a socket.
//! A rejected reply is treated exactly like a timeout: discard and retry on
//! the next scheduled poll.

use sundial_core::{NtpInstant, SundialError, SundialResult};
use sundial_wire::{Mode, Packet, PROTOCOL_VERSION};

/// Check whether a decoded reply may be used for clock correction.
///
/// `received_at` is the locally stamped T3. Accepts only when the version and
/// mode match, both server timestamps are non-zero, and the exchange ordering
/// is possible (T3 >= T0 and T2 >= T1).
pub fn check_reply(packet: &Packet, received_at: NtpInstant) -> SundialResult<()> {
    if packet.version != PROTOCOL_VERSION {
        return Err(SundialError::VersionMismatch {
            expected: PROTOCOL_VERSION,
            actual: packet.version,
        });
    }
    if packet.mode != Mode::Server {
        return Err(SundialError::ModeMismatch(packet.mode.to_bits()));
    }
    if packet.receive == NtpInstant::ZERO || packet.transmit == NtpInstant::ZERO {
        return Err(SundialError::ZeroTimestamp);
    }
    if received_at < packet.originate || packet.transmit < packet.receive {
        return Err(SundialError::TimestampOrder);
    }
    Ok(())
}
