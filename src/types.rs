// =============================================================================
// Shared types used across the chart overlay service
// =============================================================================
//
// Every series is keyed by a calendar date. Dates serialise as ISO
// `YYYY-MM-DD` strings, so equality lookups and chronological ordering agree
// on both sides of the wire.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One bar of raw market data as delivered by the upstream time-series feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvPoint {
    pub timestamp: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// A single value on a line series. `y == None` marks a gap: not enough
/// lookback, or a position outside the computed domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub x: NaiveDate,
    pub y: Option<f64>,
}

impl LabeledPoint {
    pub fn new(x: NaiveDate, y: f64) -> Self {
        Self { x, y: Some(y) }
    }

    pub fn gap(x: NaiveDate) -> Self {
        Self { x, y: None }
    }
}

/// A candlestick bar in the shape the chart renderer consumes. Padded bars
/// carry `None` in all four price slots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandlePoint {
    pub x: NaiveDate,
    pub o: Option<f64>,
    pub h: Option<f64>,
    pub l: Option<f64>,
    pub c: Option<f64>,
}

impl CandlePoint {
    pub fn gap(x: NaiveDate) -> Self {
        Self {
            x,
            o: None,
            h: None,
            l: None,
            c: None,
        }
    }
}

impl From<&OhlcvPoint> for CandlePoint {
    fn from(p: &OhlcvPoint) -> Self {
        Self {
            x: p.timestamp,
            o: Some(p.open),
            h: Some(p.high),
            l: Some(p.low),
            c: Some(p.close),
        }
    }
}

/// A moving-average line for one look-back period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmaSeries {
    pub period: usize,
    pub values: Vec<LabeledPoint>,
}

/// Bar granularity of a chart.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ChartInterval {
    #[default]
    #[serde(rename = "1day")]
    OneDay,
    #[serde(rename = "1week")]
    OneWeek,
    #[serde(rename = "1month")]
    OneMonth,
}

impl ChartInterval {
    /// Wire name used by the upstream feed and the HTTP API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneDay => "1day",
            Self::OneWeek => "1week",
            Self::OneMonth => "1month",
        }
    }
}

impl std::fmt::Display for ChartInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChartInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1day" => Ok(Self::OneDay),
            "1week" => Ok(Self::OneWeek),
            "1month" => Ok(Self::OneMonth),
            other => Err(format!("unsupported interval '{other}', use 1day, 1week or 1month")),
        }
    }
}
