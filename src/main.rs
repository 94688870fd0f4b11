//! Quotable Server
//!
//! Serves the daily two-quote tile puzzle over HTTP.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use quotable::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    info!("Quotable Server v{}", VERSION);

    let config = ServerConfig::from_env().context("invalid configuration")?;
    info!(
        bind = %config.bind_addr,
        corpus = %config.corpus_path.display(),
        rng = ?config.random_algorithm,
        utc_offset_minutes = config.utc_offset_minutes,
        "Configuration loaded"
    );

    let server = Arc::new(GameServer::from_config(config).context("failed to start")?);

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal_server.shutdown(),
            Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
        }
    });

    server.run().await.context("server error")?;
    info!("Server stopped");
    Ok(())
}
