// =============================================================================
// REST API Endpoints: Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. The service is read-mostly: one chart
// endpoint that renders a fully aligned payload, plus configuration reads and
// per-interval period updates.
//
// CORS is configured permissively; the chart front-end is served from a
// different origin.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Json, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::error::ChartError;
use crate::orchestrator::{ChartRequest, OverlaySelection};
use crate::overlay_config::IntervalPeriods;
use crate::types::ChartInterval;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/chart", get(chart))
        .route("/api/v1/config", get(get_config))
        .route("/api/v1/config/periods/:interval", put(put_periods))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Error mapping
// =============================================================================

impl IntoResponse for ChartError {
    fn into_response(self) -> Response {
        let status = match &self {
            ChartError::InvalidRequest(_) | ChartError::Contract(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ChartError::Source(_) => StatusCode::BAD_GATEWAY,
        };
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

fn parse_interval(raw: &str) -> Result<ChartInterval, ChartError> {
    raw.parse().map_err(ChartError::InvalidRequest)
}

impl From<QueryRejection> for ChartError {
    fn from(rejection: QueryRejection) -> Self {
        ChartError::InvalidRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ChartError {
    fn from(rejection: JsonRejection) -> Self {
        ChartError::InvalidRequest(rejection.body_text())
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    config_version: u64,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        config_version: state.current_config_version(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Chart
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartQuery {
    symbol: Option<String>,
    interval: Option<String>,
    outputsize: Option<usize>,
    sma: Option<bool>,
    bollinger: Option<bool>,
    ichimoku: Option<bool>,
}

async fn chart(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ChartQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ChartError> {
    let Query(query) = query?;
    // Clone once; the lock is released before any await.
    let config = state.config_snapshot();

    let symbol = query
        .symbol
        .as_deref()
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_else(|| config.default_symbol.clone());
    let interval = match query.interval.as_deref() {
        Some(raw) => parse_interval(raw)?,
        None => config.default_interval,
    };

    let request = ChartRequest {
        symbol,
        interval,
        outputsize: query.outputsize.unwrap_or(config.default_outputsize),
        overlays: OverlaySelection {
            sma: query.sma.unwrap_or(true),
            bollinger: query.bollinger.unwrap_or(true),
            ichimoku: query.ichimoku.unwrap_or(true),
        },
    };

    match state.orchestrator.build_chart(&request, &config).await {
        Ok(payload) => Ok(Json(payload)),
        Err(e) => {
            warn!(symbol = %request.symbol, interval = %request.interval, error = %e, "chart request failed");
            Err(e)
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config_snapshot())
}

async fn put_periods(
    State(state): State<Arc<AppState>>,
    Path(raw_interval): Path<String>,
    body: Result<Json<IntervalPeriods>, JsonRejection>,
) -> Result<impl IntoResponse, ChartError> {
    let interval = parse_interval(&raw_interval)?;
    let Json(periods) = body?;

    // Bump and save under the write lock so concurrent updates reach the
    // disk in the same order they reached memory.
    let version = {
        let mut config = state.config.write();
        config.set_periods(interval, periods.clone())?;
        let version = state.bump_config_version();

        if let Some(path) = &state.config_path {
            // Best-effort: the in-memory update already took effect.
            if let Err(e) = config.save(path) {
                warn!(error = %format!("{e:#}"), "failed to save overlay config to disk");
            }
        }
        version
    };
    info!(interval = %interval, version, "periods updated via API");

    Ok(Json(serde_json::json!({
        "interval": interval,
        "periods": periods,
        "config_version": version,
    })))
}
