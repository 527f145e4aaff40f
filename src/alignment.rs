// =============================================================================
// Series alignment onto a canonical label axis
// =============================================================================
//
// A chart draws every dataset against one ordered list of dates. Indicator
// series arrive shorter, longer, or keyed on dates the candles never had
// (Ichimoku projects into the future). Alignment produces, for each label,
// exactly one point: the source value when a point with an equal key exists,
// a gap otherwise.
//
// Lookup is exact key equality. When a source repeats a key, the first
// occurrence wins.
// =============================================================================

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use chrono::NaiveDate;

use crate::error::SeriesError;
use crate::types::{CandlePoint, LabeledPoint, OhlcvPoint};
use crate::validation::add_days;

/// Index `series` by key, keeping the first occurrence of each key.
fn first_by_key<T, F>(series: &[T], key: F) -> HashMap<NaiveDate, &T>
where
    F: Fn(&T) -> NaiveDate,
{
    let mut index = HashMap::with_capacity(series.len());
    for item in series {
        if let Entry::Vacant(slot) = index.entry(key(item)) {
            slot.insert(item);
        }
    }
    index
}

/// Align a line series onto `labels`. Output length is always `labels.len()`.
pub fn align_scalar(labels: &[NaiveDate], series: &[LabeledPoint]) -> Vec<LabeledPoint> {
    let index = first_by_key(series, |p| p.x);
    labels
        .iter()
        .map(|&x| LabeledPoint {
            x,
            y: index.get(&x).and_then(|p| p.y),
        })
        .collect()
}

/// Align a candlestick series onto `labels`. Missing bars become the null
/// quadruple.
pub fn align_candle(labels: &[NaiveDate], series: &[CandlePoint]) -> Vec<CandlePoint> {
    let index = first_by_key(series, |c| c.x);
    labels
        .iter()
        .map(|&x| match index.get(&x) {
            Some(c) => CandlePoint { x, ..**c },
            None => CandlePoint::gap(x),
        })
        .collect()
}

/// Build the canonical axis: every bar date, then `forward_days` synthetic
/// dates one calendar day apart after the last bar.
///
/// # Errors
/// - `forward_days > 0` with no bars to anchor the synthetic dates on
/// - calendar overflow
pub fn build_label_axis(
    candles: &[OhlcvPoint],
    forward_days: usize,
) -> Result<Vec<NaiveDate>, SeriesError> {
    let mut labels: Vec<NaiveDate> = candles.iter().map(|c| c.timestamp).collect();
    if forward_days == 0 {
        return Ok(labels);
    }

    let last = match labels.last() {
        Some(&d) => d,
        None => return Err(SeriesError::EmptySeries { series: "candles" }),
    };
    labels.reserve(forward_days);
    for j in 1..=forward_days {
        labels.push(add_days(last, j as u64)?);
    }
    Ok(labels)
}

/// Candlestick view of raw bars.
pub fn candle_points(candles: &[OhlcvPoint]) -> Vec<CandlePoint> {
    candles.iter().map(CandlePoint::from).collect()
}

/// Volume bars as a line-shaped series.
pub fn volume_points(candles: &[OhlcvPoint]) -> Vec<LabeledPoint> {
    candles
        .iter()
        .map(|c| LabeledPoint::new(c.timestamp, c.volume as f64))
        .collect()
}
