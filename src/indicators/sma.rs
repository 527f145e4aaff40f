// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// SMA_i = mean(close[i - period + 1 ..= i])
//
// The output is keyed by the bar dates so it can be fed straight into the
// Bollinger calculator or the aligner. Positions with fewer than `period`
// observations are gaps.
// =============================================================================

use crate::error::SeriesError;
use crate::types::{LabeledPoint, OhlcvPoint};
use crate::validation::{ensure_chronological, ensure_period};

/// Compute the SMA line over the closes of `bars`.
///
/// Output has one point per bar with the bar's date. Indices below
/// `period - 1` are `None`.
pub fn calculate_sma(bars: &[OhlcvPoint], period: usize) -> Result<Vec<LabeledPoint>, SeriesError> {
    ensure_period("period", period)?;
    ensure_chronological("bars", bars.iter().map(|b| b.timestamp))?;

    let mut out = Vec::with_capacity(bars.len());
    // Running sum of the trailing window.
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close;
        if i >= period {
            sum -= bars[i - period].close;
        }

        if i + 1 < period {
            out.push(LabeledPoint::gap(bar.timestamp));
        } else {
            out.push(LabeledPoint::new(bar.timestamp, sum / period as f64));
        }
    }

    Ok(out)
}
