// =============================================================================
// Twelve Data REST Client: time series and SMA feeds
// =============================================================================
//
// SECURITY: The API key travels in the `Authorization: apikey <key>` header
// (marked sensitive), never in the URL. Transport errors are stripped of their
// URL before they are wrapped, so error text carries only the endpoint name.
//
// Twelve Data returns `values` newest-first with every number encoded as a
// JSON string. Both are normalised here: callers get ascending series with
// `f64`/`u64` fields.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use futures_util::future::{BoxFuture, FutureExt};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::{debug, instrument};

use crate::market_data::MarketDataSource;
use crate::types::{ChartInterval, LabeledPoint, OhlcvPoint};

const DEFAULT_BASE_URL: &str = "https://api.twelvedata.com";

/// Twelve Data REST API client.
#[derive(Clone)]
pub struct TwelveDataClient {
    base_url: String,
    client: reqwest::Client,
}

impl TwelveDataClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut default_headers = HeaderMap::new();
        if !api_key.is_empty() {
            let mut val = HeaderValue::from_str(&format!("apikey {api_key}"))
                .context("TWELVEDATA_API_KEY contains characters not allowed in a header")?;
            val.set_sensitive(true);
            default_headers.insert(AUTHORIZATION, val);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        debug!(base_url = DEFAULT_BASE_URL, "TwelveDataClient initialised");

        Ok(Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Point the client at a different host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    // -------------------------------------------------------------------------
    // Requests
    // -------------------------------------------------------------------------

    /// GET `{base_url}/{endpoint}` and return the body text.
    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> Result<String> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let resp = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("GET /{endpoint} request failed"))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("failed to read /{endpoint} response body"))?;

        if !status.is_success() {
            anyhow::bail!("Twelve Data GET /{endpoint} returned {status}: {body}");
        }
        Ok(body)
    }

    /// GET /time_series: OHLCV bars, oldest first.
    #[instrument(skip(self), name = "twelve_data::time_series")]
    pub async fn fetch_time_series(
        &self,
        symbol: &str,
        interval: ChartInterval,
        outputsize: usize,
    ) -> Result<Vec<OhlcvPoint>> {
        let params = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("outputsize", outputsize.to_string()),
        ];
        let body = self.get("time_series", &params).await?;
        let bars = parse_time_series(&body)?;
        debug!(count = bars.len(), "time series retrieved");
        Ok(bars)
    }

    /// GET /sma: upstream simple moving average, oldest first.
    #[instrument(skip(self), name = "twelve_data::sma")]
    pub async fn fetch_sma(
        &self,
        symbol: &str,
        interval: ChartInterval,
        period: usize,
        outputsize: usize,
    ) -> Result<Vec<LabeledPoint>> {
        let params = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("time_period", period.to_string()),
            ("outputsize", outputsize.to_string()),
        ];
        let body = self.get("sma", &params).await?;
        let points = parse_sma(&body)?;
        debug!(count = points.len(), "sma series retrieved");
        Ok(points)
    }
}

impl MarketDataSource for TwelveDataClient {
    fn time_series<'a>(
        &'a self,
        symbol: &'a str,
        interval: ChartInterval,
        outputsize: usize,
    ) -> BoxFuture<'a, Result<Vec<OhlcvPoint>>> {
        self.fetch_time_series(symbol, interval, outputsize).boxed()
    }

    fn sma<'a>(
        &'a self,
        symbol: &'a str,
        interval: ChartInterval,
        period: usize,
        outputsize: usize,
    ) -> BoxFuture<'a, Result<Vec<LabeledPoint>>> {
        self.fetch_sma(symbol, interval, period, outputsize).boxed()
    }
}

// -----------------------------------------------------------------------------
// Response parsing
// -----------------------------------------------------------------------------

/// Extract the `values` array, turning `"status": "error"` bodies into errors.
fn values_array(body: &str) -> Result<Vec<serde_json::Value>> {
    let root: serde_json::Value =
        serde_json::from_str(body).context("failed to parse Twelve Data JSON")?;

    if root["status"].as_str() == Some("error") {
        let message = root["message"].as_str().unwrap_or("unknown error");
        anyhow::bail!("Twelve Data API error: {message}");
    }

    match root.get("values") {
        Some(serde_json::Value::Array(values)) => Ok(values.clone()),
        _ => anyhow::bail!("Twelve Data response has no values array"),
    }
}

/// Parse a `/time_series` body into ascending bars.
fn parse_time_series(body: &str) -> Result<Vec<OhlcvPoint>> {
    let values = values_array(body)?;
    let mut bars = Vec::with_capacity(values.len());

    // Newest first on the wire.
    for v in values.iter().rev() {
        let volume = match &v["volume"] {
            serde_json::Value::Null => 0,
            other => parse_string_f64(other, "volume")?.max(0.0) as u64,
        };
        bars.push(OhlcvPoint {
            timestamp: parse_date(&v["datetime"])?,
            open: parse_string_f64(&v["open"], "open")?,
            high: parse_string_f64(&v["high"], "high")?,
            low: parse_string_f64(&v["low"], "low")?,
            close: parse_string_f64(&v["close"], "close")?,
            volume,
        });
    }

    Ok(bars)
}

/// Parse a `/sma` body into ascending points.
fn parse_sma(body: &str) -> Result<Vec<LabeledPoint>> {
    let values = values_array(body)?;
    values
        .iter()
        .rev()
        .map(|v| {
            Ok(LabeledPoint::new(
                parse_date(&v["datetime"])?,
                parse_string_f64(&v["sma"], "sma")?,
            ))
        })
        .collect()
}

/// `"2024-01-05"` or `"2024-01-05 15:30:00"` → the calendar date.
fn parse_date(val: &serde_json::Value) -> Result<NaiveDate> {
    let s = val.as_str().context("missing field datetime")?;
    let date_part = s.split_whitespace().next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .with_context(|| format!("failed to parse datetime {s}"))
}

/// Helper: Twelve Data sends numeric values as JSON strings.
fn parse_string_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    match val {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}")),
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64")),
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
