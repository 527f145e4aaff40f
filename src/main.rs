// =============================================================================
// Chart Overlays: Main Entry Point
// =============================================================================
//
// Serves aligned candlestick + indicator payloads (SMA, Bollinger Bands,
// Ichimoku) built from the Twelve Data feed.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod alignment;
mod api;
mod app_state;
mod error;
mod indicators;
mod market_data;
mod orchestrator;
mod overlay_config;
mod types;
mod validation;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::market_data::{CachedSource, TwelveDataClient};
use crate::overlay_config::OverlayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Chart overlay service starting up");

    let config_path = PathBuf::from(
        std::env::var("OVERLAY_CONFIG_PATH").unwrap_or_else(|_| "overlay_config.json".into()),
    );
    let config = OverlayConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %format!("{e:#}"), "Failed to load config, using defaults");
        OverlayConfig::default()
    });

    info!(
        default_symbol = %config.default_symbol,
        default_interval = %config.default_interval,
        intervals = config.intervals.len(),
        cache_ttl_secs = config.cache_ttl_secs,
        "Overlay configuration ready"
    );

    // ── 2. Upstream feed ─────────────────────────────────────────────────
    let api_key = std::env::var("TWELVEDATA_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        warn!("TWELVEDATA_API_KEY is not set; upstream requests will be rejected");
    }
    let mut client = TwelveDataClient::new(api_key)?;
    if let Ok(base_url) = std::env::var("TWELVEDATA_BASE_URL") {
        info!(base_url = %base_url, "Using custom Twelve Data host");
        client = client.with_base_url(base_url);
    }
    let source = CachedSource::new(client, Duration::from_secs(config.cache_ttl_secs));

    // ── 3. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config, Arc::new(source), Some(config_path.clone())));

    // ── 4. Start the API server ──────────────────────────────────────────
    let bind_addr =
        std::env::var("OVERLAY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    if let Err(e) = state.config_snapshot().save(&config_path) {
        error!(error = %format!("{e:#}"), "Failed to save overlay config on shutdown");
    }

    info!("Chart overlay service shut down complete.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received, stopping gracefully");
}
