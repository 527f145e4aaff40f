pub mod cache;
pub mod twelve_data;

#[cfg(test)]
pub(crate) mod stub;

use anyhow::Result;
use futures_util::future::BoxFuture;

use crate::types::{ChartInterval, LabeledPoint, OhlcvPoint};

pub use cache::CachedSource;
pub use twelve_data::TwelveDataClient;

/// Upstream provider of raw bars and precomputed moving averages.
///
/// Both methods return series in ascending date order.
pub trait MarketDataSource: Send + Sync {
    fn time_series<'a>(
        &'a self,
        symbol: &'a str,
        interval: ChartInterval,
        outputsize: usize,
    ) -> BoxFuture<'a, Result<Vec<OhlcvPoint>>>;

    fn sma<'a>(
        &'a self,
        symbol: &'a str,
        interval: ChartInterval,
        period: usize,
        outputsize: usize,
    ) -> BoxFuture<'a, Result<Vec<LabeledPoint>>>;
}
