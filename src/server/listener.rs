use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::http::connection::Connection;
use crate::relay::{Fetcher, RelayHandler};

pub async fn run<F: Fetcher>(
    listen_addr: &str,
    handler: Arc<RelayHandler<F>>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    info!("Listening on {}", listen_addr);

    serve(listener, handler).await
}

/// Accepts connections forever, one task per connection.
pub async fn serve<F: Fetcher>(
    listener: TcpListener,
    handler: Arc<RelayHandler<F>>,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Accepted connection from {}", peer);

        let handler = Arc::clone(&handler);
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, handler);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
