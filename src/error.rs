// =============================================================================
// Error types
// =============================================================================
//
// Short lookback and unmatched keys are not errors: they surface as gaps in
// the output series. What remains here are contract violations on the inputs
// (caller bugs) and failures of the upstream data feed.

use chrono::NaiveDate;
use thiserror::Error;

/// A violated input invariant. Returned synchronously by the calculators.
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    /// A look-back or offset period of zero.
    #[error("invalid period: {name} must be >= 1")]
    InvalidPeriod { name: &'static str },

    /// Two series that must line up index-for-index have different lengths.
    #[error("length mismatch: {left} has {left_len} points, {right} has {right_len}")]
    LengthMismatch {
        left: &'static str,
        left_len: usize,
        right: &'static str,
        right_len: usize,
    },

    /// Keys not strictly increasing (out of order or duplicated).
    #[error("{series} is not strictly chronological at index {index}: {previous} then {current}")]
    NonChronological {
        series: &'static str,
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("{series} is empty")]
    EmptySeries { series: &'static str },

    /// Synthetic date arithmetic ran past the representable calendar.
    #[error("date overflow adding {days} days to {from}")]
    DateOverflow { from: NaiveDate, days: u64 },
}

/// Everything that can go wrong while building a chart payload.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Contract(#[from] SeriesError),

    #[error("market data source failed: {0:#}")]
    Source(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = SeriesError::InvalidPeriod { name: "kijun_period" };
        assert_eq!(err.to_string(), "invalid period: kijun_period must be >= 1");

        let err = SeriesError::LengthMismatch {
            left: "sma_series",
            left_len: 3,
            right: "close_prices",
            right_len: 2,
        };
        assert!(err.to_string().contains("sma_series has 3 points"));
    }

    #[test]
    fn contract_error_converts_into_chart_error() {
        let err: ChartError = SeriesError::EmptySeries { series: "candles" }.into();
        assert!(matches!(err, ChartError::Contract(_)));
        assert_eq!(err.to_string(), "candles is empty");
    }
}
