use dodge_proxy::config::Config;
use dodge_proxy::{logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load();
    logging::init(cfg.verbosity());

    tokio::select! {
        res = server::listener::run(&cfg) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
