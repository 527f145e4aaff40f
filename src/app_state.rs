// =============================================================================
// Central Application State
// =============================================================================
//
// Shared across all request handlers via `Arc<AppState>`. The overlay
// configuration sits behind a `parking_lot::RwLock`; handlers clone it once
// per request and hand the clone to the orchestrator, so no lock is held
// across an await point.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::market_data::MarketDataSource;
use crate::orchestrator::IndicatorOrchestrator;
use crate::overlay_config::OverlayConfig;

pub struct AppState {
    // ── Configuration ───────────────────────────────────────────────────
    pub config: RwLock<OverlayConfig>,

    /// Where period updates are persisted. `None` keeps updates in memory.
    pub config_path: Option<PathBuf>,

    /// Incremented on every successful configuration change.
    pub config_version: AtomicU64,

    // ── Chart pipeline ──────────────────────────────────────────────────
    pub orchestrator: IndicatorOrchestrator,

    // ── Timing ──────────────────────────────────────────────────────────
    /// Instant when the service was started. Used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        config: OverlayConfig,
        source: Arc<dyn MarketDataSource>,
        config_path: Option<PathBuf>,
    ) -> Self {
        Self {
            config: RwLock::new(config),
            config_path,
            config_version: AtomicU64::new(1),
            orchestrator: IndicatorOrchestrator::new(source),
            start_time: std::time::Instant::now(),
        }
    }

    /// Snapshot of the configuration for one request.
    pub fn config_snapshot(&self) -> OverlayConfig {
        self.config.read().clone()
    }

    pub fn bump_config_version(&self) -> u64 {
        self.config_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_config_version(&self) -> u64 {
        self.config_version.load(Ordering::SeqCst)
    }
}
