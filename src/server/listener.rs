use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{Instrument, error, info, info_span, trace};

use crate::config::Config;
use crate::proxy::{Dialer, RelaySession, TcpDialer};
use crate::sequence::ConnectionIds;

pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.listen_addrs()[..])
        .await
        .with_context(|| format!("Cannot open tcp server on port {}", cfg.port))?;
    info!(
        "Proxy is now on port {} ({})",
        cfg.port,
        listener.local_addr()?
    );

    serve(listener, TcpDialer, Arc::new(ConnectionIds::new())).await
}

/// Accept connections forever, one relay task per connection.
///
/// There is no limit on the number of live sessions.
pub async fn serve<D>(
    listener: TcpListener,
    dialer: D,
    ids: Arc<ConnectionIds>,
) -> anyhow::Result<()>
where
    D: Dialer + Clone + 'static,
{
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Cannot accept connection: {}", e);
                continue;
            }
        };

        let id = ids.next_id();
        let span = info_span!("conn", id, %peer);
        let dialer = dialer.clone();

        tokio::spawn(
            async move {
                trace!("Connection started");
                let summary = RelaySession::new(socket, dialer).run().await;
                trace!(
                    completed = summary.cycles_completed,
                    abandoned = summary.cycles_abandoned,
                    "Connection closed"
                );
            }
            .instrument(span),
        );
    }
}
