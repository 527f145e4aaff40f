// =============================================================================
// Overlay Configuration: per-granularity indicator periods with atomic save
// =============================================================================
//
// Every tunable period the overlays use lives here, keyed by chart interval.
// The record is plain data: the orchestrator receives a clone per request,
// so nothing reads mutable global state while computing.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::SeriesError;
use crate::indicators::IchimokuParams;
use crate::types::ChartInterval;
use crate::validation::ensure_period;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbol() -> String {
    "AAPL".to_string()
}

fn default_outputsize() -> usize {
    200
}

fn default_max_outputsize() -> usize {
    5000
}

fn default_bollinger_multiplier() -> f64 {
    crate::indicators::DEFAULT_MULTIPLIER
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_intervals() -> BTreeMap<ChartInterval, IntervalPeriods> {
    let mut map = BTreeMap::new();
    map.insert(
        ChartInterval::OneDay,
        IntervalPeriods::new(vec![5, 25, 75], 25, ichimoku(9, 25, 52, 25)),
    );
    map.insert(
        ChartInterval::OneWeek,
        IntervalPeriods::new(vec![13, 26, 52], 26, ichimoku(13, 25, 52, 25)),
    );
    map.insert(
        ChartInterval::OneMonth,
        IntervalPeriods::new(vec![9, 24, 60], 24, ichimoku(9, 23, 60, 25)),
    );
    map
}

fn ichimoku(tenkan: usize, kijun: usize, senkou_b: usize, offset: usize) -> IchimokuParams {
    IchimokuParams {
        tenkan_period: tenkan,
        kijun_period: kijun,
        senkou_b_period: senkou_b,
        chikou_offset_period: offset,
    }
}

// =============================================================================
// IntervalPeriods
// =============================================================================

/// Indicator periods for one chart interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalPeriods {
    /// Moving-average lines drawn on the candle pane.
    #[serde(default)]
    pub sma_periods: Vec<usize>,

    /// Period of the moving average the Bollinger Bands wrap.
    pub bollinger_period: usize,

    pub ichimoku: IchimokuParams,
}

impl IntervalPeriods {
    pub fn new(sma_periods: Vec<usize>, bollinger_period: usize, ichimoku: IchimokuParams) -> Self {
        Self {
            sma_periods,
            bollinger_period,
            ichimoku,
        }
    }

    /// Periods used for an interval the config file does not mention.
    pub fn fallback() -> Self {
        Self::new(Vec::new(), 20, ichimoku(9, 25, 52, 26))
    }

    /// Reject zero periods anywhere in the set.
    pub fn validate(&self) -> Result<(), SeriesError> {
        for &p in &self.sma_periods {
            ensure_period("sma_periods", p)?;
        }
        ensure_period("bollinger_period", self.bollinger_period)?;
        self.ichimoku.validate()
    }
}

// =============================================================================
// OverlayConfig
// =============================================================================

/// Top-level configuration for the overlay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    // --- Request defaults ---------------------------------------------------

    /// Symbol charted when a request names none.
    #[serde(default = "default_symbol")]
    pub default_symbol: String,

    #[serde(default)]
    pub default_interval: ChartInterval,

    /// Bars requested when a request names no size.
    #[serde(default = "default_outputsize")]
    pub default_outputsize: usize,

    /// Upper bound on bars per request (upstream hard limit).
    #[serde(default = "default_max_outputsize")]
    pub max_outputsize: usize,

    // --- Indicators ---------------------------------------------------------

    #[serde(default = "default_bollinger_multiplier")]
    pub bollinger_multiplier: f64,

    #[serde(default = "default_intervals")]
    pub intervals: BTreeMap<ChartInterval, IntervalPeriods>,

    // --- Upstream -----------------------------------------------------------

    /// How long fetched series are reused before hitting the feed again.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            default_symbol: default_symbol(),
            default_interval: ChartInterval::default(),
            default_outputsize: default_outputsize(),
            max_outputsize: default_max_outputsize(),
            bollinger_multiplier: default_bollinger_multiplier(),
            intervals: default_intervals(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl OverlayConfig {
    /// Periods for `interval`, or the fallback set when unconfigured.
    pub fn periods_for(&self, interval: ChartInterval) -> IntervalPeriods {
        self.intervals
            .get(&interval)
            .cloned()
            .unwrap_or_else(IntervalPeriods::fallback)
    }

    /// Replace the periods for one interval after validating them.
    pub fn set_periods(
        &mut self,
        interval: ChartInterval,
        periods: IntervalPeriods,
    ) -> Result<(), SeriesError> {
        periods.validate()?;
        info!(
            interval = %interval,
            sma = ?periods.sma_periods,
            bollinger = periods.bollinger_period,
            ichimoku = %periods.ichimoku,
            "interval periods updated"
        );
        self.intervals.insert(interval, periods);
        Ok(())
    }

    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read overlay config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse overlay config from {}", path.display()))?;

        for (interval, periods) in &config.intervals {
            periods
                .validate()
                .with_context(|| format!("invalid periods for {interval} in {}", path.display()))?;
        }

        info!(
            path = %path.display(),
            intervals = config.intervals.len(),
            default_symbol = %config.default_symbol,
            "overlay config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise overlay config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "overlay config saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = OverlayConfig::default();
        assert_eq!(cfg.default_symbol, "AAPL");
        assert_eq!(cfg.default_interval, ChartInterval::OneDay);
        assert_eq!(cfg.default_outputsize, 200);
        assert!((cfg.bollinger_multiplier - 2.0).abs() < f64::EPSILON);

        let day = cfg.periods_for(ChartInterval::OneDay);
        assert_eq!(day.sma_periods, vec![5, 25, 75]);
        assert_eq!(day.bollinger_period, 25);
        assert_eq!(day.ichimoku, ichimoku(9, 25, 52, 25));

        let month = cfg.periods_for(ChartInterval::OneMonth);
        assert_eq!(month.sma_periods, vec![9, 24, 60]);
        assert_eq!(month.ichimoku.kijun_period, 23);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: OverlayConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.intervals.len(), 3);
        assert_eq!(cfg.max_outputsize, 5000);
        assert_eq!(cfg.cache_ttl_secs, 300);
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{
            "default_symbol": "MSFT",
            "intervals": {
                "1week": {
                    "sma_periods": [10],
                    "bollinger_period": 10,
                    "ichimoku": {
                        "tenkan_period": 7,
                        "kijun_period": 22,
                        "senkou_b_period": 44,
                        "chikou_offset_period": 22
                    }
                }
            }
        }"#;
        let cfg: OverlayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.default_symbol, "MSFT");
        assert_eq!(cfg.default_outputsize, 200);
        assert_eq!(cfg.periods_for(ChartInterval::OneWeek).sma_periods, vec![10]);
        // Intervals the file leaves out fall back.
        assert_eq!(
            cfg.periods_for(ChartInterval::OneDay),
            IntervalPeriods::fallback()
        );
    }

    #[test]
    fn fallback_matches_classic_ichimoku_offset() {
        let fb = IntervalPeriods::fallback();
        assert!(fb.sma_periods.is_empty());
        assert_eq!(fb.ichimoku.chikou_offset_period, 26);
    }

    #[test]
    fn set_periods_rejects_zero() {
        let mut cfg = OverlayConfig::default();
        let bad = IntervalPeriods::new(vec![5, 0], 5, ichimoku(9, 26, 52, 26));
        assert!(cfg.set_periods(ChartInterval::OneDay, bad).is_err());
        assert_eq!(cfg.periods_for(ChartInterval::OneDay).sma_periods, vec![5, 25, 75]);

        let good = IntervalPeriods::new(vec![20], 20, ichimoku(9, 26, 52, 26));
        cfg.set_periods(ChartInterval::OneDay, good.clone()).unwrap();
        assert_eq!(cfg.periods_for(ChartInterval::OneDay), good);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("overlay-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("overlay_config.json");

        let mut cfg = OverlayConfig::default();
        cfg.default_symbol = "NVDA".into();
        cfg.save(&path).unwrap();

        let loaded = OverlayConfig::load(&path).unwrap();
        assert_eq!(loaded.default_symbol, "NVDA");
        assert_eq!(loaded.intervals, cfg.intervals);
        assert!(!path.with_extension("json.tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_missing_file_is_an_error() {
        assert!(OverlayConfig::load("/nonexistent/overlay_config.json").is_err());
    }
}
