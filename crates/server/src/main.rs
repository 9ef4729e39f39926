//! tunecache server entry point.
//!
//! Loads configuration, opens the cache, runs install and activation, then
//! serves HTTP until interrupted. Logs are JSON on stderr.

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tunecache_core::{AppConfig, CacheDb};
use tunecache_server::{AppState, app};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache at {}", config.db_path.display()))?;

    let state = AppState::from_config(&config, db)?;
    let lifecycle = state.worker.start().await;
    tracing::info!(version = %config.cache_version, %lifecycle, "worker started");

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, upstream = %config.upstream_origin, "starting tunecache server");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
