//! UDP client endpoint

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use sundial_core::{SundialError, SundialResult};

use crate::Datagram;

/// Well-known NTP server port.
pub const NTP_PORT: u16 = 123;

/// UDP endpoint connected to a single time source.
pub struct UdpEndpoint {
    socket: UdpSocket,
    local_addr: SocketAddr,
}

impl UdpEndpoint {
    /// Bind an ephemeral local port and connect to `host:port`. The host name
    /// is resolved here; pool names resolve to a different member per call.
    pub async fn connect(host: &str, port: u16) -> SundialResult<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| SundialError::Transport(e.to_string()))?;

        socket
            .connect((host, port))
            .await
            .map_err(|e| SundialError::Transport(e.to_string()))?;

        let local_addr = socket
            .local_addr()
            .map_err(|e| SundialError::Transport(e.to_string()))?;

        tracing::debug!(%local_addr, host, port, "udp endpoint connected");

        Ok(UdpEndpoint { socket, local_addr })
    }

    /// Get local address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl Datagram for UdpEndpoint {
    async fn send(&self, payload: &[u8]) -> SundialResult<()> {
        self.socket
            .send(payload)
            .await
            .map_err(|e| SundialError::Transport(e.to_string()))?;
        Ok(())
    }

    async fn recv_timeout(
        &self,
        max_len: usize,
        timeout: Duration,
    ) -> SundialResult<Option<Vec<u8>>> {
        let mut buf = vec![0u8; max_len];
        match tokio::time::timeout(timeout, self.socket.recv(&mut buf)).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok(len)) => {
                buf.truncate(len);
                Ok(Some(buf))
            }
            Ok(Err(e)) => Err(SundialError::Transport(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_endpoint_binds_ephemeral_port() {
        let endpoint = UdpEndpoint::connect("127.0.0.1", 9).await.unwrap();
        assert_ne!(endpoint.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_recv_timeout_returns_none() {
        let endpoint = UdpEndpoint::connect("127.0.0.1", 9).await.unwrap();
        let got = endpoint
            .recv_timeout(48, Duration::from_millis(10))
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_loopback_exchange() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_addr = server.local_addr().unwrap();

        let endpoint = UdpEndpoint::connect("127.0.0.1", server_addr.port())
            .await
            .unwrap();

        endpoint.send(b"ping").await.unwrap();

        let mut buf = [0u8; 16];
        let (len, peer) = server.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"ping");

        server.send_to(b"pong", peer).await.unwrap();

        let got = endpoint
            .recv_timeout(16, Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(got.as_deref(), Some(&b"pong"[..]));
    }
}
