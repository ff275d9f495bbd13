//! The local clock store
//!
//! `LocalClock` holds the disciplined wall time as Unix split time
//! (epoch seconds + sub-second microseconds), anchored to the monotonic OS
//! clock so reads advance between corrections. The synchronization controller
//! is the single mutation authority; display and reporting contexts only read,
//! through a `SharedClock` handle.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::time::{NtpInstant, MICROS_PER_SEC};

/// The mutable local-time state.
///
/// Stores a base (seconds, microseconds) plus the monotonic instant at which
/// the base was last written. Reads return base + elapsed.
#[derive(Clone, Debug)]
pub struct LocalClock {
    base_secs: u64,
    base_micros: u32,
    anchor: Instant,
}

impl LocalClock {
    /// Create a clock at the Unix epoch. The controller hard-sets it during
    /// initial acquisition before anything meaningful reads it.
    pub fn new() -> Self {
        LocalClock {
            base_secs: 0,
            base_micros: 0,
            anchor: Instant::now(),
        }
    }

    /// Hard-set the clock. Microseconds above one second carry into seconds.
    pub fn set(&mut self, secs: u64, micros: u64) {
        self.base_secs = secs + micros / MICROS_PER_SEC;
        self.base_micros = (micros % MICROS_PER_SEC) as u32;
        self.anchor = Instant::now();
    }

    /// Hard-set the clock from an NTP-era instant.
    pub fn set_ntp(&mut self, t: NtpInstant) {
        let (secs, micros) = t.to_unix();
        self.set(secs, micros as u64);
    }

    /// Apply a signed microsecond correction, saturating at the Unix epoch.
    pub fn adjust(&mut self, delta_micros: i64) {
        let (secs, micros) = self.now_parts();
        let total = (secs * MICROS_PER_SEC + micros as u64).saturating_add_signed(delta_micros);
        self.set(total / MICROS_PER_SEC, total % MICROS_PER_SEC);
    }

    /// Current Unix split time: (epoch seconds, sub-second microseconds).
    pub fn now_parts(&self) -> (u64, u32) {
        let elapsed = self.anchor.elapsed().as_micros() as u64;
        let total = self.base_secs * MICROS_PER_SEC + self.base_micros as u64 + elapsed;
        (total / MICROS_PER_SEC, (total % MICROS_PER_SEC) as u32)
    }

    /// Current Unix epoch second.
    pub fn epoch_secs(&self) -> u64 {
        self.now_parts().0
    }

    /// Current time as an NTP-era instant.
    pub fn now_ntp(&self) -> NtpInstant {
        let (secs, micros) = self.now_parts();
        NtpInstant::from_unix(secs, micros)
    }
}

impl Default for LocalClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to the local clock.
///
/// Mutation stays with the controller; any number of readers may sample the
/// current time concurrently.
#[derive(Clone, Debug)]
pub struct SharedClock(Arc<RwLock<LocalClock>>);

impl SharedClock {
    pub fn new() -> Self {
        SharedClock(Arc::new(RwLock::new(LocalClock::new())))
    }

    pub fn set(&self, secs: u64, micros: u64) {
        self.0.write().set(secs, micros);
    }

    pub fn set_ntp(&self, t: NtpInstant) {
        self.0.write().set_ntp(t);
    }

    pub fn adjust(&self, delta_micros: i64) {
        self.0.write().adjust(delta_micros);
    }

    pub fn now_parts(&self) -> (u64, u32) {
        self.0.read().now_parts()
    }

    pub fn epoch_secs(&self) -> u64 {
        self.0.read().epoch_secs()
    }

    pub fn now_ntp(&self) -> NtpInstant {
        self.0.read().now_ntp()
    }
}

impl Default for SharedClock {
    fn default() -> Self {
        Self::new()
    }
}
