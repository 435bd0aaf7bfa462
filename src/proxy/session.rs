use bytes::Bytes;
use tokio::io::{
    AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, ReadHalf, WriteHalf,
};

use crate::http::{FramingError, Host, read_request, read_response};
use crate::proxy::dummy::dodge_payload;
use crate::proxy::upstream::Dialer;

/// Where a session is within its current relay cycle.
///
/// ```text
///   AwaitRequest ──▶ Dialing ──▶ Sending ──▶ AwaitDummyResponse
///        ▲              │           │               │
///        │   abandon ◀──┴───────────┴───────────────┤
///        │                                          ▼
///        └──────────── Relaying ◀──────── AwaitRealResponse
///
///   AwaitRequest ──(no request)──▶ Closed
/// ```
pub enum SessionState<S> {
    AwaitRequest,
    Dialing {
        host: Host,
        request: Bytes,
    },
    Sending {
        host: Host,
        request: Bytes,
        upstream: BufReader<S>,
    },
    AwaitDummyResponse {
        host: Host,
        upstream: BufReader<S>,
    },
    AwaitRealResponse {
        host: Host,
        upstream: BufReader<S>,
    },
    Relaying {
        host: Host,
        response: Bytes,
    },
    Closed,
}

/// Counters reported when a session ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Cycles whose response was written to the client.
    pub cycles_completed: u64,
    /// Cycles dropped without a response reaching the client.
    pub cycles_abandoned: u64,
}

/// One client connection and the upstream connection of its current cycle.
///
/// Cycles run strictly one after another: the next request is not read until
/// the current one has been relayed or abandoned. No operation has a
/// timeout.
pub struct RelaySession<C, D: Dialer> {
    reader: BufReader<ReadHalf<C>>,
    writer: BufWriter<WriteHalf<C>>,
    dialer: D,
    state: SessionState<D::Stream>,
    summary: SessionSummary,
}

impl<C, D> RelaySession<C, D>
where
    C: AsyncRead + AsyncWrite,
    D: Dialer,
{
    pub fn new(client: C, dialer: D) -> Self {
        let (read_half, write_half) = tokio::io::split(client);
        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            dialer,
            state: SessionState::AwaitRequest,
            summary: SessionSummary::default(),
        }
    }

    /// Relay requests until the client stops sending them.
    pub async fn run(mut self) -> SessionSummary {
        loop {
            let state = std::mem::replace(&mut self.state, SessionState::Closed);

            self.state = match state {
                SessionState::AwaitRequest => self.await_request().await,

                SessionState::Dialing { host, request } => self.dial(host, request).await,

                SessionState::Sending {
                    host,
                    request,
                    upstream,
                } => self.send(host, request, upstream).await,

                SessionState::AwaitDummyResponse { host, upstream } => {
                    self.discard_dummy_response(host, upstream).await
                }

                SessionState::AwaitRealResponse { host, upstream } => {
                    self.await_real_response(host, upstream).await
                }

                SessionState::Relaying { host, response } => self.relay(host, response).await,

                SessionState::Closed => break,
            };
        }

        self.summary
    }

    async fn await_request(&mut self) -> SessionState<D::Stream> {
        match read_request(&mut self.reader).await {
            Ok(Some((request, host))) => {
                tracing::trace!(host = %host, len = request.len(), "Request received");
                SessionState::Dialing { host, request }
            }
            Ok(None) => {
                tracing::trace!("Client finished sending requests");
                SessionState::Closed
            }
            Err(FramingError::UnexpectedEof) => {
                tracing::trace!("Client disconnected mid-request");
                SessionState::Closed
            }
            Err(e) => {
                tracing::debug!(error = %e, "Rejected client request");
                SessionState::Closed
            }
        }
    }

    async fn dial(&mut self, host: Host, request: Bytes) -> SessionState<D::Stream> {
        let Some(name) = host.as_str() else {
            tracing::error!(host = %host, "Cannot open socket: host is not valid UTF-8");
            return self.abandon();
        };

        match self.dialer.dial(name).await {
            Ok(stream) => SessionState::Sending {
                host,
                request,
                upstream: BufReader::new(stream),
            },
            Err(e) => {
                tracing::error!(host = %host, error = %e, "Cannot open socket to upstream");
                self.abandon()
            }
        }
    }

    async fn send(
        &mut self,
        host: Host,
        request: Bytes,
        mut upstream: BufReader<D::Stream>,
    ) -> SessionState<D::Stream> {
        // Dummy and request leave in one write so they share the first segment.
        let payload = dodge_payload(&request);

        let sent = async {
            upstream.write_all(&payload).await?;
            upstream.flush().await
        }
        .await;

        match sent {
            Ok(()) => {
                tracing::trace!(host = %host, "Sent dummy request ahead of real request");
                SessionState::AwaitDummyResponse { host, upstream }
            }
            Err(e) => {
                tracing::error!(host = %host, error = %e, "Send failed");
                self.abandon()
            }
        }
    }

    async fn discard_dummy_response(
        &mut self,
        host: Host,
        mut upstream: BufReader<D::Stream>,
    ) -> SessionState<D::Stream> {
        match read_response(&mut upstream).await {
            Ok(dummy) => {
                tracing::trace!(host = %host, len = dummy.len(), "Discarded dummy response");
                SessionState::AwaitRealResponse { host, upstream }
            }
            Err(e) => {
                tracing::error!(host = %host, error = %e, "Failed to parse dummy response");
                self.abandon()
            }
        }
    }

    async fn await_real_response(
        &mut self,
        host: Host,
        mut upstream: BufReader<D::Stream>,
    ) -> SessionState<D::Stream> {
        // The upstream connection is closed here, whatever the outcome.
        match read_response(&mut upstream).await {
            Ok(response) => {
                tracing::trace!(host = %host, len = response.len(), "Response received");
                SessionState::Relaying { host, response }
            }
            Err(e) => {
                tracing::error!(host = %host, error = %e, "Failed to parse response");
                self.abandon()
            }
        }
    }

    async fn relay(&mut self, host: Host, response: Bytes) -> SessionState<D::Stream> {
        let written = async {
            self.writer.write_all(&response).await?;
            self.writer.flush().await
        }
        .await;

        match written {
            Ok(()) => {
                tracing::trace!(host = %host, "Relayed response to client");
                self.summary.cycles_completed += 1;
                SessionState::AwaitRequest
            }
            Err(e) => {
                tracing::error!(host = %host, error = %e, "Failed to relay response");
                self.abandon()
            }
        }
    }

    fn abandon(&mut self) -> SessionState<D::Stream> {
        self.summary.cycles_abandoned += 1;
        SessionState::AwaitRequest
    }
}
