// =============================================================================
// Ichimoku Kinko Hyo
// =============================================================================
//
// For each bar i, with mid(p) = (max high + min low) / 2 over the trailing
// window of p bars ending at i (clipped at the start of the series):
//
//   tenkan_i   = mid(tenkan_period)
//   kijun_i    = mid(kijun_period)
//   senkou_a_i = (tenkan_i + kijun_i) / 2      plotted k bars ahead
//   senkou_b_i = mid(senkou_b_period)          plotted k bars ahead
//   chikou     = close_i                       plotted k bars behind
//
// where k = chikou_offset_period. Displacement is materialised in the keys:
// senkou points past the last bar get synthetic dates, one calendar day
// apart, and tenkan/kijun/chikou are padded with gaps on the same dates so
// all five lines span the same extended domain.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::SeriesError;
use crate::types::{LabeledPoint, OhlcvPoint};
use crate::validation::{add_days, ensure_chronological, ensure_period};

/// Window lengths and displacement for one Ichimoku overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IchimokuParams {
    pub tenkan_period: usize,
    pub kijun_period: usize,
    pub senkou_b_period: usize,
    /// Bars of displacement: senkou spans forward, chikou backward.
    pub chikou_offset_period: usize,
}

impl IchimokuParams {
    pub fn validate(&self) -> Result<(), SeriesError> {
        ensure_period("tenkan_period", self.tenkan_period)?;
        ensure_period("kijun_period", self.kijun_period)?;
        ensure_period("senkou_b_period", self.senkou_b_period)?;
        ensure_period("chikou_offset_period", self.chikou_offset_period)
    }
}

impl std::fmt::Display for IchimokuParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Ichimoku({},{},{},{})",
            self.tenkan_period, self.kijun_period, self.senkou_b_period, self.chikou_offset_period
        )
    }
}

/// The five Ichimoku lines. Every line has `n + k` points.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IchimokuLines {
    pub tenkan: Vec<LabeledPoint>,
    pub kijun: Vec<LabeledPoint>,
    pub senkou_a: Vec<LabeledPoint>,
    pub senkou_b: Vec<LabeledPoint>,
    pub chikou: Vec<LabeledPoint>,
}

/// Midpoint of the highest high and lowest low over the `period` bars ending
/// at `i`. Near the start of the series the window is simply shorter.
fn midpoint(candles: &[OhlcvPoint], i: usize, period: usize) -> f64 {
    let start = (i + 1).saturating_sub(period);
    let (high, low) = candles[start..=i]
        .iter()
        .fold((f64::NEG_INFINITY, f64::INFINITY), |(h, l), c| {
            (h.max(c.high), l.min(c.low))
        });
    (high + low) / 2.0
}

/// Compute all five Ichimoku lines over `candles`.
///
/// # Errors
/// - `candles` is empty
/// - any period in `params` is zero
/// - candle timestamps are not strictly increasing
/// - a synthetic future date is not representable
pub fn compute_ichimoku(
    candles: &[OhlcvPoint],
    params: &IchimokuParams,
) -> Result<IchimokuLines, SeriesError> {
    params.validate()?;
    let last = match candles.last() {
        Some(c) => c.timestamp,
        None => return Err(SeriesError::EmptySeries { series: "candles" }),
    };
    ensure_chronological("candles", candles.iter().map(|c| c.timestamp))?;

    let n = candles.len();
    let k = params.chikou_offset_period;

    let mut tenkan = Vec::with_capacity(n + k);
    let mut kijun = Vec::with_capacity(n + k);
    let mut senkou_a = Vec::with_capacity(n);
    let mut senkou_b = Vec::with_capacity(n);
    let mut chikou = Vec::with_capacity(n + k);

    for (i, candle) in candles.iter().enumerate() {
        let t = midpoint(candles, i, params.tenkan_period);
        let kj = midpoint(candles, i, params.kijun_period);
        let sb = midpoint(candles, i, params.senkou_b_period);

        if i >= k {
            chikou.push(LabeledPoint::new(candles[i - k].timestamp, candle.close));
        }

        tenkan.push(LabeledPoint::new(candle.timestamp, t));
        kijun.push(LabeledPoint::new(candle.timestamp, kj));

        // Bar i + k if it exists, else the synthetic day it would fall on:
        // index n maps to last + 1, index n + 1 to last + 2, and so on. The
        // plain `i + k - n` offset used by some chart scripts maps index n to
        // the last bar's own date, duplicating a key.
        let ahead = if i + k < n {
            candles[i + k].timestamp
        } else {
            add_days(last, (i + k + 1 - n) as u64)?
        };
        senkou_a.push(LabeledPoint::new(ahead, (t + kj) / 2.0));
        senkou_b.push(LabeledPoint::new(ahead, sb));
    }

    // Chikou keys are exactly the first `chikou.len()` tenkan keys; the
    // remaining bar dates have nothing to plot yet.
    let covered = chikou.len();
    chikou.extend(tenkan[covered..].iter().map(|p| LabeledPoint::gap(p.x)));

    for j in 1..=k {
        let x = add_days(last, j as u64)?;
        tenkan.push(LabeledPoint::gap(x));
        kijun.push(LabeledPoint::gap(x));
        chikou.push(LabeledPoint::gap(x));
    }

    Ok(IchimokuLines {
        tenkan,
        kijun,
        senkou_a,
        senkou_b,
        chikou,
    })
}
