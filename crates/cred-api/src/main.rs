//! # cred-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `PORT` (default 8080).
//!
//! Environment:
//! - `CRED_STATE_DIR`: persist campaigns and claims as JSON under this
//!   directory. Unset means in-memory only.
//! - `CRED_HASH_ALGORITHM`, `CRED_DUPLICATE_POLICY`,
//!   `CRED_CONFIRMATION_TIMEOUT_SECS`: see `DistributionConfig::from_env`.
//! - `RUST_LOG`: tracing filter (default `info`).

use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;

use cred_api::state::AppState;
use cred_distribution::{CampaignStore, DistributionConfig, FileStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let config = DistributionConfig::from_env().context("loading distribution config")?;

    let store: Arc<dyn CampaignStore> = match std::env::var("CRED_STATE_DIR") {
        Ok(dir) => {
            tracing::info!(dir = %dir, "using file-backed campaign store");
            Arc::new(FileStore::open(&dir).with_context(|| format!("opening store at {dir}"))?)
        }
        Err(_) => {
            tracing::warn!("CRED_STATE_DIR not set; campaigns are held in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    let state = AppState::with_store(store, config)
        .context("loading stored campaigns")?
        .with_metrics(metrics);
    let app = cred_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("cred-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
