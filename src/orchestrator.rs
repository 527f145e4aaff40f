// =============================================================================
// Indicator Orchestrator: fetch, compute, align
// =============================================================================
//
// One chart render:
//
//   1. fetch the bars and every needed SMA period concurrently
//   2. put each SMA on the bar axis (a failed SMA feed falls back to a local
//      computation so one bad period does not blank the chart)
//   3. run Bollinger on the Bollinger-period SMA and Ichimoku on the bars
//   4. align every series onto the canonical axis: bar dates, extended by
//      the Ichimoku displacement when Ichimoku is on
//
// The calculators are synchronous; only step 1 awaits.
// =============================================================================

use std::sync::Arc;

use chrono::NaiveDate;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::alignment::{align_candle, align_scalar, build_label_axis, candle_points, volume_points};
use crate::error::ChartError;
use crate::indicators::{calculate_sma, compute_bollinger_bands, compute_ichimoku, IchimokuLines};
use crate::market_data::MarketDataSource;
use crate::overlay_config::OverlayConfig;
use crate::types::{CandlePoint, ChartInterval, LabeledPoint, OhlcvPoint, SmaSeries};
use crate::validation::ensure_chronological;

// =============================================================================
// Request / response
// =============================================================================

/// Which overlays to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlaySelection {
    pub sma: bool,
    pub bollinger: bool,
    pub ichimoku: bool,
}

impl Default for OverlaySelection {
    fn default() -> Self {
        Self {
            sma: true,
            bollinger: true,
            ichimoku: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub symbol: String,
    pub interval: ChartInterval,
    pub outputsize: usize,
    pub overlays: OverlaySelection,
}

/// Bollinger Bands plus the parameters they were built with.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BollingerOverlay {
    pub period: usize,
    pub multiplier: f64,
    pub upper_band: Vec<LabeledPoint>,
    pub lower_band: Vec<LabeledPoint>,
}

/// Everything a chart needs. Every series has exactly one point per entry
/// of `labels`, in label order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPayload {
    pub symbol: String,
    pub interval: ChartInterval,
    pub labels: Vec<NaiveDate>,
    pub candles: Vec<CandlePoint>,
    pub volume: Vec<LabeledPoint>,
    pub sma: Vec<SmaSeries>,
    pub bollinger: Option<BollingerOverlay>,
    pub ichimoku: Option<IchimokuLines>,
}

impl ChartPayload {
    fn empty(request: &ChartRequest) -> Self {
        Self {
            symbol: request.symbol.clone(),
            interval: request.interval,
            labels: Vec::new(),
            candles: Vec::new(),
            volume: Vec::new(),
            sma: Vec::new(),
            bollinger: None,
            ichimoku: None,
        }
    }
}

// =============================================================================
// IndicatorOrchestrator
// =============================================================================

pub struct IndicatorOrchestrator {
    source: Arc<dyn MarketDataSource>,
}

impl IndicatorOrchestrator {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self { source }
    }

    /// Build the aligned chart payload for `request` using the periods in
    /// `config`.
    #[instrument(
        skip(self, request, config),
        fields(symbol = %request.symbol, interval = %request.interval)
    )]
    pub async fn build_chart(
        &self,
        request: &ChartRequest,
        config: &OverlayConfig,
    ) -> Result<ChartPayload, ChartError> {
        if request.symbol.trim().is_empty() {
            return Err(ChartError::InvalidRequest("symbol must not be empty".into()));
        }
        if request.outputsize == 0 || request.outputsize > config.max_outputsize {
            return Err(ChartError::InvalidRequest(format!(
                "outputsize must be between 1 and {}, got {}",
                config.max_outputsize, request.outputsize
            )));
        }

        let periods = config.periods_for(request.interval);
        periods.validate()?;
        let overlays = request.overlays;

        // ── 1. Fetch ─────────────────────────────────────────────────────
        let mut wanted: Vec<usize> = Vec::new();
        if overlays.sma {
            wanted.extend(periods.sma_periods.iter().copied());
        }
        if overlays.bollinger && !wanted.contains(&periods.bollinger_period) {
            wanted.push(periods.bollinger_period);
        }

        let source = &self.source;
        let symbol = request.symbol.as_str();
        let (interval, outputsize) = (request.interval, request.outputsize);

        let bars_fut = source.time_series(symbol, interval, outputsize);
        let smas_fut = join_all(wanted.iter().map(|&period| async move {
            (period, source.sma(symbol, interval, period, outputsize).await)
        }));
        let (bars, fetched) = tokio::join!(bars_fut, smas_fut);

        let bars = bars.map_err(ChartError::Source)?;
        ensure_chronological("candles", bars.iter().map(|b| b.timestamp))?;
        if bars.is_empty() {
            warn!("upstream returned no bars");
            return Ok(ChartPayload::empty(request));
        }

        // ── 2. SMAs on the bar axis ──────────────────────────────────────
        let bar_labels: Vec<NaiveDate> = bars.iter().map(|b| b.timestamp).collect();
        let mut on_bars: Vec<SmaSeries> = Vec::with_capacity(fetched.len());
        for (period, result) in fetched {
            let values = match result {
                Ok(points) => align_scalar(&bar_labels, &points),
                Err(e) => {
                    warn!(period, error = %format!("{e:#}"), "sma fetch failed, computing locally");
                    calculate_sma(&bars, period)?
                }
            };
            on_bars.push(SmaSeries { period, values });
        }

        // ── 3 + 4. Indicators and the canonical axis ─────────────────────
        let forward_days = if overlays.ichimoku {
            periods.ichimoku.chikou_offset_period
        } else {
            0
        };
        let labels = build_label_axis(&bars, forward_days)?;

        let sma = if overlays.sma {
            periods
                .sma_periods
                .iter()
                .filter_map(|&p| on_bars.iter().find(|s| s.period == p))
                .map(|s| SmaSeries {
                    period: s.period,
                    values: align_scalar(&labels, &s.values),
                })
                .collect()
        } else {
            Vec::new()
        };

        let bollinger = if overlays.bollinger {
            Some(bollinger_overlay(&bars, &on_bars, &labels, periods.bollinger_period, config)?)
        } else {
            None
        };

        let ichimoku = if overlays.ichimoku {
            let raw = compute_ichimoku(&bars, &periods.ichimoku)?;
            Some(IchimokuLines {
                tenkan: align_scalar(&labels, &raw.tenkan),
                kijun: align_scalar(&labels, &raw.kijun),
                senkou_a: align_scalar(&labels, &raw.senkou_a),
                senkou_b: align_scalar(&labels, &raw.senkou_b),
                chikou: align_scalar(&labels, &raw.chikou),
            })
        } else {
            None
        };

        let payload = ChartPayload {
            symbol: request.symbol.clone(),
            interval: request.interval,
            candles: align_candle(&labels, &candle_points(&bars)),
            volume: align_scalar(&labels, &volume_points(&bars)),
            labels,
            sma,
            bollinger,
            ichimoku,
        };

        info!(
            bars = bars.len(),
            labels = payload.labels.len(),
            sma_lines = payload.sma.len(),
            bollinger = payload.bollinger.is_some(),
            ichimoku = payload.ichimoku.is_some(),
            "chart payload built"
        );

        Ok(payload)
    }
}

/// Bands around the Bollinger-period SMA (already on the bar axis), then
/// aligned onto `labels`.
fn bollinger_overlay(
    bars: &[OhlcvPoint],
    on_bars: &[SmaSeries],
    labels: &[NaiveDate],
    period: usize,
    config: &OverlayConfig,
) -> Result<BollingerOverlay, ChartError> {
    let average = match on_bars.iter().find(|s| s.period == period) {
        Some(s) => s.values.clone(),
        None => calculate_sma(bars, period)?,
    };
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let bands = compute_bollinger_bands(&average, &closes, period, config.bollinger_multiplier)?;

    Ok(BollingerOverlay {
        period,
        multiplier: config.bollinger_multiplier,
        upper_band: align_scalar(labels, &bands.upper_band),
        lower_band: align_scalar(labels, &bands.lower_band),
    })
}
