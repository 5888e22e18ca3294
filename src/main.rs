// =============================================================================
// Market Pulse — Main Entry Point
// =============================================================================
//
// JSON backend for the market dashboard: proxies Yahoo Finance and reshapes
// quotes, index levels, history and exports for the front-end.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod config;
mod history;
mod provider;
mod quotes;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::ServerConfig;
use crate::provider::YahooClient;

const DEFAULT_CONFIG_PATH: &str = "market_pulse.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Market Pulse — starting up");

    let config_path =
        std::env::var("MARKET_PULSE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = ServerConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        ServerConfig::default()
    });
    config.apply_env_overrides();

    info!(tickers = ?config.trending_tickers, "Configured trending tickers");
    info!(
        indices = ?config.market_indices.iter().map(|i| &i.symbol).collect::<Vec<_>>(),
        "Configured market indices"
    );

    // ── 2. Provider client & shared state ────────────────────────────────
    let provider = Arc::new(YahooClient::new(&config.provider)?);
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, provider));

    // ── 3. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            warn!("Shutdown signal received — stopping gracefully");
        })
        .await
        .context("API server failed")?;

    info!("Market Pulse shut down complete.");
    Ok(())
}
