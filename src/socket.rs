//! Async UDP socket abstraction.
//!
//! [`UdpEndpoint`] is a thin wrapper around `tokio::net::UdpSocket` exposing
//! exactly the two primitives the transfer loops need: fire-and-forget
//! datagram send, and a **bounded** receive that returns `None` on expiry
//! instead of blocking forever.  The bound is what guarantees the sender's
//! timeout phase runs at least once per timeout interval even when no traffic
//! arrives.
//!
//! Datagrams cross this boundary as raw bytes; decoding (and the decision to
//! silently drop garbage) belongs to the protocol layers above.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tokio::net::UdpSocket;

/// Largest datagram we will accept.  A 1024-byte fragment grows under base64
/// framing but stays well inside this.
const MAX_DATAGRAM: usize = 65_535;

/// Errors that can arise from socket operations.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Underlying I/O error from the OS.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An async datagram endpoint.
///
/// All methods are `&self` so the endpoint can be shared across tasks.
#[derive(Debug)]
pub struct UdpEndpoint {
    /// Address this socket is bound to (resolved after the OS assigns a port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl UdpEndpoint {
    /// Bind a new endpoint to `local_addr`.
    ///
    /// Passing port 0 lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Send one datagram to `dest`.
    pub async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<(), SocketError> {
        self.inner.send_to(bytes, dest).await?;
        Ok(())
    }

    /// Wait at most `timeout` for one datagram.
    ///
    /// Returns `Ok(None)` when the deadline passes with nothing received —
    /// the caller loops and lets its timeout phase run.
    pub async fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Option<(Vec<u8>, SocketAddr)>, SocketError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        match tokio::time::timeout(timeout, self.inner.recv_from(&mut buf)).await {
            Ok(Ok((n, addr))) => {
                buf.truncate(n);
                Ok(Some((buf, addr)))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_elapsed) => Ok(None),
        }
    }
}
