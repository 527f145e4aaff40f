use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use tracing::debug;

use crate::market_data::MarketDataSource;
use crate::types::{ChartInterval, LabeledPoint, OhlcvPoint};

/// A cached series and the moment it was fetched.
struct Entry<T> {
    fetched_at: Instant,
    data: T,
}

type Slot<T> = RwLock<HashMap<String, Entry<T>>>;

/// TTL cache in front of another [`MarketDataSource`].
///
/// Entries are keyed `symbol:interval:period:outputsize` (raw bars use
/// period `0`). Failed fetches are not cached.
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    bars: Slot<Vec<OhlcvPoint>>,
    smas: Slot<Vec<LabeledPoint>>,
}

fn cache_key(symbol: &str, interval: ChartInterval, period: usize, outputsize: usize) -> String {
    format!("{symbol}:{interval}:{period}:{outputsize}")
}

impl<S: MarketDataSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            bars: RwLock::new(HashMap::new()),
            smas: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live (unexpired) entries across both slots.
    #[cfg(test)]
    fn len(&self) -> usize {
        let live = |t: &Instant| t.elapsed() < self.ttl;
        self.bars.read().values().filter(|e| live(&e.fetched_at)).count()
            + self.smas.read().values().filter(|e| live(&e.fetched_at)).count()
    }

    fn lookup<T: Clone>(&self, slot: &Slot<T>, key: &str) -> Option<T> {
        let map = slot.read();
        map.get(key)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.data.clone())
    }

    fn store<T>(&self, slot: &Slot<T>, key: String, data: T) {
        let mut map = slot.write();
        // Drop stale entries so the map does not grow without bound.
        map.retain(|_, e| e.fetched_at.elapsed() < self.ttl);
        map.insert(
            key,
            Entry {
                fetched_at: Instant::now(),
                data,
            },
        );
    }
}

impl<S: MarketDataSource> MarketDataSource for CachedSource<S> {
    fn time_series<'a>(
        &'a self,
        symbol: &'a str,
        interval: ChartInterval,
        outputsize: usize,
    ) -> BoxFuture<'a, Result<Vec<OhlcvPoint>>> {
        async move {
            let key = cache_key(symbol, interval, 0, outputsize);
            if let Some(hit) = self.lookup(&self.bars, &key) {
                debug!(key = %key, "time series cache hit");
                return Ok(hit);
            }
            let fresh = self.inner.time_series(symbol, interval, outputsize).await?;
            self.store(&self.bars, key, fresh.clone());
            Ok(fresh)
        }
        .boxed()
    }

    fn sma<'a>(
        &'a self,
        symbol: &'a str,
        interval: ChartInterval,
        period: usize,
        outputsize: usize,
    ) -> BoxFuture<'a, Result<Vec<LabeledPoint>>> {
        async move {
            let key = cache_key(symbol, interval, period, outputsize);
            if let Some(hit) = self.lookup(&self.smas, &key) {
                debug!(key = %key, "sma cache hit");
                return Ok(hit);
            }
            let fresh = self.inner.sma(symbol, interval, period, outputsize).await?;
            self.store(&self.smas, key, fresh.clone());
            Ok(fresh)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;

    /// Source that counts calls and fails on the symbol "FAIL".
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
    }

    impl MarketDataSource for CountingSource {
        fn time_series<'a>(
            &'a self,
            symbol: &'a str,
            _interval: ChartInterval,
            _outputsize: usize,
        ) -> BoxFuture<'a, Result<Vec<OhlcvPoint>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if symbol == "FAIL" {
                Err(anyhow::anyhow!("upstream down"))
            } else {
                Ok(vec![OhlcvPoint {
                    timestamp: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                    open: 1.0,
                    high: 1.0,
                    low: 1.0,
                    close: 1.0,
                    volume: 1,
                }])
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
            self.calls.fetch_add(1, Ordering::SeqCst);
            let x = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
            async move { Ok(vec![LabeledPoint::new(x, period as f64)]) }.boxed()
        }
    }

    #[test]
    fn key_format() {
        assert_eq!(cache_key("AAPL", ChartInterval::OneDay, 25, 200), "AAPL:1day:25:200");
    }

    #[tokio::test]
    async fn repeated_request_is_served_from_cache() {
        let cache = CachedSource::new(CountingSource::default(), Duration::from_secs(60));
        let a = cache.time_series("AAPL", ChartInterval::OneDay, 10).await.unwrap();
        let b = cache.time_series("AAPL", ChartInterval::OneDay, 10).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn different_parameters_miss() {
        let cache = CachedSource::new(CountingSource::default(), Duration::from_secs(60));
        cache.sma("AAPL", ChartInterval::OneDay, 5, 10).await.unwrap();
        let other = cache.sma("AAPL", ChartInterval::OneDay, 25, 10).await.unwrap();
        cache.sma("AAPL", ChartInterval::OneWeek, 5, 10).await.unwrap();
        assert_eq!(other[0].y, Some(25.0));
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_ttl_never_hits() {
        let cache = CachedSource::new(CountingSource::default(), Duration::ZERO);
        cache.time_series("AAPL", ChartInterval::OneDay, 10).await.unwrap();
        cache.time_series("AAPL", ChartInterval::OneDay, 10).await.unwrap();
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = CachedSource::new(CountingSource::default(), Duration::from_secs(60));
        assert!(cache.time_series("FAIL", ChartInterval::OneDay, 10).await.is_err());
        assert!(cache.time_series("FAIL", ChartInterval::OneDay, 10).await.is_err());
        assert_eq!(cache.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 0);
    }
}
