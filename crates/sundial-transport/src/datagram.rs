//! The transport contract consumed by the sync engine

use std::time::Duration;

use async_trait::async_trait;

use sundial_core::SundialResult;

/// Black-box datagram operations against the configured time source.
///
/// A receive that times out returns `Ok(None)`; the pending exchange is
/// abandoned and the next attempt builds a fresh request.
#[async_trait]
pub trait Datagram: Send + Sync {
    /// Send one datagram to the time source.
    async fn send(&self, payload: &[u8]) -> SundialResult<()>;

    /// Receive up to `max_len` bytes, or `None` once `timeout` elapses.
    async fn recv_timeout(
        &self,
        max_len: usize,
        timeout: Duration,
    ) -> SundialResult<Option<Vec<u8>>>;
}
