use std::sync::Arc;

use harmonia_relay::config::Config;
use harmonia_relay::relay::{HttpFetcher, RelayHandler};
use harmonia_relay::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let fetcher = HttpFetcher::new(&cfg.relay)?;
    let handler = Arc::new(RelayHandler::new(cfg.relay.clone(), fetcher));

    tokio::select! {
        res = server::listener::run(&cfg.server.listen_addr, handler) => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
