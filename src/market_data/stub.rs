// =============================================================================
// In-memory market data source for orchestrator and API tests
// =============================================================================

use std::collections::HashMap;

use anyhow::Result;
use chrono::{Days, NaiveDate};
use futures_util::future::{BoxFuture, FutureExt};

use crate::market_data::MarketDataSource;
use crate::types::{ChartInterval, LabeledPoint, OhlcvPoint};

/// Serves fixed bars and per-period SMA series. A period with no entry in
/// `smas` fails, as does every bar request when `fail_bars` is set.
#[derive(Default)]
pub struct StubSource {
    pub bars: Vec<OhlcvPoint>,
    pub smas: HashMap<usize, Vec<LabeledPoint>>,
    pub fail_bars: bool,
}

impl StubSource {
    pub fn with_bars(bars: Vec<OhlcvPoint>) -> Self {
        Self {
            bars,
            ..Self::default()
        }
    }

    pub fn with_sma(mut self, period: usize, points: Vec<LabeledPoint>) -> Self {
        self.smas.insert(period, points);
        self
    }
}

impl MarketDataSource for StubSource {
    fn time_series<'a>(
        &'a self,
        _symbol: &'a str,
        _interval: ChartInterval,
        _outputsize: usize,
    ) -> BoxFuture<'a, Result<Vec<OhlcvPoint>>> {
        let result = if self.fail_bars {
            Err(anyhow::anyhow!("time series feed unavailable"))
        } else {
            Ok(self.bars.clone())
        };
        async move { result }.boxed()
    }

    fn sma<'a>(
        &'a self,
        _symbol: &'a str,
        _interval: ChartInterval,
        period: usize,
        _outputsize: usize,
    ) -> BoxFuture<'a, Result<Vec<LabeledPoint>>> {
        let result = self
            .smas
            .get(&period)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no sma({period}) upstream"));
        async move { result }.boxed()
    }
}

/// `n` consecutive daily bars from 2024-01-01 with a saw-tooth close.
pub fn daily_bars(n: usize) -> Vec<OhlcvPoint> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i % 7) as f64 - (i % 3) as f64 * 0.5;
            OhlcvPoint {
                timestamp: start + Days::new(i as u64),
                open: close - 0.25,
                high: close + 1.0 + (i % 2) as f64,
                low: close - 1.5,
                close,
                volume: 1_000 + i as u64 * 10,
            }
        })
        .collect()
}
