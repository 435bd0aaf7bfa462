//! Upstream connections.
//!
//! A fresh connection is dialed for every relay cycle and dropped when the
//! cycle ends. There is no pooling and no connect timeout.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Every upstream is reached on the standard HTTP port.
pub const HTTP_PORT: u16 = 80;

/// Opens upstream connections by host name.
pub trait Dialer: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connect to `host`. The host is used as-is; a `:port` suffix is not
    /// split off.
    fn dial(&self, host: &str) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Dials `host:80` over TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, host: &str) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((host, HTTP_PORT)).await?;
        tracing::trace!(host, "Connected to upstream");
        Ok(stream)
    }
}
