//! Shared helpers for relay tests: a dialer that hands every upstream
//! connection to the test as an in-memory stream.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use dodge_proxy::http::read_request;
use dodge_proxy::proxy::Dialer;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream, ReadBuf};
use tokio::sync::mpsc;

pub const PIPE_CAPACITY: usize = 64 * 1024;

/// Stream wrapper that records every chunk accepted by `poll_write`.
pub struct Recorded {
    inner: DuplexStream,
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl AsyncRead for Recorded {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for Recorded {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let poll = Pin::new(&mut self.inner).poll_write(cx, buf);
        if let Poll::Ready(Ok(n)) = &poll {
            self.writes.lock().unwrap().push(buf[..*n].to_vec());
        }
        poll
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// An upstream connection as seen from the server side.
pub struct Upstream {
    pub host: String,
    pub stream: BufReader<DuplexStream>,
}

impl Upstream {
    /// Read the two requests a relay cycle sends: the dummy, then the real one.
    pub async fn read_pair(&mut self) -> (Bytes, Bytes) {
        let (dummy, _) = read_request(&mut self.stream).await.unwrap().unwrap();
        let (real, _) = read_request(&mut self.stream).await.unwrap().unwrap();
        (dummy, real)
    }

    pub async fn reply(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }
}

/// Dialer that refuses the listed hosts and passes every other connection
/// to the test through a channel.
#[derive(Clone)]
pub struct ChannelDialer {
    upstreams: mpsc::UnboundedSender<Upstream>,
    refused: Arc<HashSet<String>>,
    pub writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl ChannelDialer {
    pub fn new(refused: &[&str]) -> (Self, mpsc::UnboundedReceiver<Upstream>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dialer = Self {
            upstreams: tx,
            refused: Arc::new(refused.iter().map(|h| h.to_string()).collect()),
            writes: Arc::new(Mutex::new(Vec::new())),
        };
        (dialer, rx)
    }
}

impl Dialer for ChannelDialer {
    type Stream = Recorded;

    async fn dial(&self, host: &str) -> io::Result<Recorded> {
        if self.refused.contains(host) {
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        }

        let (proxy_end, server_end) = tokio::io::duplex(PIPE_CAPACITY);
        self.upstreams
            .send(Upstream {
                host: host.to_string(),
                stream: BufReader::new(server_end),
            })
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "test dropped receiver"))?;

        Ok(Recorded {
            inner: proxy_end,
            writes: self.writes.clone(),
        })
    }
}

fn broken_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "peer went away")
}

/// Upstream whose writes always fail and whose reads see end of stream.
pub struct BrokenUpstream;

impl AsyncRead for BrokenUpstream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for BrokenUpstream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(broken_pipe()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Dialer that always connects, to an upstream that cannot be written to.
#[derive(Clone, Default)]
pub struct BrokenDialer {
    pub dials: Arc<AtomicUsize>,
}

impl Dialer for BrokenDialer {
    type Stream = BrokenUpstream;

    async fn dial(&self, _host: &str) -> io::Result<BrokenUpstream> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        Ok(BrokenUpstream)
    }
}

/// Client that sends a fixed byte script and then hangs up, and whose
/// side of the connection rejects every write.
pub struct DeafClient {
    script: &'static [u8],
}

impl DeafClient {
    pub fn new(script: &'static [u8]) -> Self {
        Self { script }
    }
}

impl AsyncRead for DeafClient {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.script).poll_read(cx, buf)
    }
}

impl AsyncWrite for DeafClient {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(broken_pipe()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

pub fn response(body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}
