//! Error types for sundial

use thiserror::Error;

/// Errors raised across the sundial workspace.
///
/// None of these are fatal to the synchronization loop: a failed exchange is
/// skipped and retried on the next scheduled poll.
#[derive(Error, Debug)]
pub enum SundialError {
    // Wire errors
    #[error("buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    // Reply validation errors
    #[error("protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    #[error("unexpected mode in reply: {0}")]
    ModeMismatch(u8),

    #[error("zero server timestamp in reply")]
    ZeroTimestamp,

    #[error("impossible timestamp ordering in exchange")]
    TimestampOrder,

    // Exchange errors
    #[error("no reply within timeout")]
    Timeout,

    #[error("sample untrusted: rtt {rtt_micros}us outside sanity bound")]
    UntrustedSample { rtt_micros: i64 },

    // Transport errors
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for sundial operations.
pub type SundialResult<T> = Result<T, SundialError>;
