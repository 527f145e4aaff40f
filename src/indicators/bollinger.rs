// =============================================================================
// Bollinger Bands
// =============================================================================
//
// The bands wrap a moving average that has already been computed (or
// fetched) elsewhere:
//
//   upper_i = avg_i + k * sigma_i
//   lower_i = avg_i - k * sigma_i
//
// sigma_i is the population standard deviation of the trailing `period`
// closes measured against avg_i itself, not against the window's own mean.
// For an SMA of the same period the two coincide.
//
// A zero or NaN average is treated as missing and yields a gap, the same as a
// `None` average. Charts downstream rely on this to suppress bands built on
// a zero-as-missing placeholder.
// =============================================================================

use serde::Serialize;

use crate::error::SeriesError;
use crate::types::LabeledPoint;
use crate::validation::{ensure_chronological, ensure_period};

/// Standard-deviation multiplier used when the caller has no preference.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Upper and lower band, index-aligned with the input average series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BollingerBands {
    pub upper_band: Vec<LabeledPoint>,
    pub lower_band: Vec<LabeledPoint>,
}

/// Compute Bollinger Bands around `sma_series`.
///
/// `close_prices[i]` must be the close of the bar that `sma_series[i]` is
/// keyed on. Both bands have exactly `sma_series.len()` points with the same
/// keys.
///
/// Index `i` is a gap in both bands when:
/// - `i < period - 1` (short window), or
/// - the average at `i` is `None`, `0.0` or NaN.
///
/// # Errors
/// - `period == 0`
/// - `close_prices` and `sma_series` differ in length
/// - `sma_series` keys are not strictly increasing
pub fn compute_bollinger_bands(
    sma_series: &[LabeledPoint],
    close_prices: &[f64],
    period: usize,
    multiplier: f64,
) -> Result<BollingerBands, SeriesError> {
    ensure_period("period", period)?;
    if sma_series.len() != close_prices.len() {
        return Err(SeriesError::LengthMismatch {
            left: "sma_series",
            left_len: sma_series.len(),
            right: "close_prices",
            right_len: close_prices.len(),
        });
    }
    ensure_chronological("sma_series", sma_series.iter().map(|p| p.x))?;

    let mut upper_band = Vec::with_capacity(sma_series.len());
    let mut lower_band = Vec::with_capacity(sma_series.len());

    for (i, point) in sma_series.iter().enumerate() {
        let avg = match point.y {
            Some(v) if i + 1 >= period && v != 0.0 && !v.is_nan() => v,
            _ => {
                upper_band.push(LabeledPoint::gap(point.x));
                lower_band.push(LabeledPoint::gap(point.x));
                continue;
            }
        };

        let window = &close_prices[i + 1 - period..=i];
        let variance = window.iter().map(|p| (p - avg).powi(2)).sum::<f64>() / period as f64;
        let std_dev = variance.sqrt();

        upper_band.push(LabeledPoint::new(point.x, avg + multiplier * std_dev));
        lower_band.push(LabeledPoint::new(point.x, avg - multiplier * std_dev));
    }

    Ok(BollingerBands {
        upper_band,
        lower_band,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn series(values: &[Option<f64>]) -> Vec<LabeledPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &y)| LabeledPoint { x: day(i as u32 + 1), y })
            .collect()
    }

    #[test]
    fn bollinger_two_period_scenario() {
        let sma = series(&[None, Some(5.0)]);
        let bands = compute_bollinger_bands(&sma, &[4.0, 6.0], 2, 2.0).unwrap();

        assert_eq!(bands.upper_band[0], LabeledPoint::gap(day(1)));
        assert_eq!(bands.lower_band[0], LabeledPoint::gap(day(1)));
        assert_eq!(bands.upper_band[1], LabeledPoint::new(day(2), 7.0));
        assert_eq!(bands.lower_band[1], LabeledPoint::new(day(2), 3.0));
    }

    #[test]
    fn bollinger_gaps_before_window_even_with_average() {
        // An upstream average may be present before the window fills; the
        // window length still governs.
        let sma = series(&[Some(1.0), Some(1.0), Some(2.0), Some(3.0)]);
        let bands = compute_bollinger_bands(&sma, &[1.0, 2.0, 3.0, 4.0], 3, 2.0).unwrap();
        assert!(bands.upper_band[0].y.is_none());
        assert!(bands.upper_band[1].y.is_none());
        assert!(bands.upper_band[2].y.is_some());
        assert!(bands.lower_band[3].y.is_some());
    }

    #[test]
    fn bollinger_zero_average_is_a_gap() {
        let sma = series(&[None, Some(0.0), Some(5.0)]);
        let bands = compute_bollinger_bands(&sma, &[4.0, 6.0, 5.0], 2, 2.0).unwrap();
        assert_eq!(bands.upper_band[1], LabeledPoint::gap(day(2)));
        assert_eq!(bands.lower_band[1], LabeledPoint::gap(day(2)));
        assert!(bands.upper_band[2].y.is_some());
    }

    #[test]
    fn bollinger_nan_average_is_a_gap() {
        let sma = series(&[Some(f64::NAN)]);
        let bands = compute_bollinger_bands(&sma, &[4.0], 1, 2.0).unwrap();
        assert!(bands.upper_band[0].y.is_none());
    }

    #[test]
    fn bollinger_deviation_measured_against_supplied_average() {
        // Window [4, 6] has mean 5, but the supplied average is 4:
        // sigma = sqrt((0^2 + 2^2) / 2) = sqrt(2).
        let sma = series(&[None, Some(4.0)]);
        let bands = compute_bollinger_bands(&sma, &[4.0, 6.0], 2, 1.0).unwrap();
        let sigma = 2.0_f64.sqrt();
        assert!((bands.upper_band[1].y.unwrap() - (4.0 + sigma)).abs() < 1e-12);
        assert!((bands.lower_band[1].y.unwrap() - (4.0 - sigma)).abs() < 1e-12);
    }

    #[test]
    fn bollinger_flat_prices_collapse_bands() {
        let sma = series(&[None, None, Some(100.0)]);
        let bands = compute_bollinger_bands(&sma, &[100.0; 3], 3, DEFAULT_MULTIPLIER).unwrap();
        assert_eq!(bands.upper_band[2].y, Some(100.0));
        assert_eq!(bands.lower_band[2].y, Some(100.0));
    }

    #[test]
    fn bollinger_output_length_matches_input() {
        let sma = series(&[None, Some(2.0), Some(3.0), None, Some(5.0)]);
        let closes = [1.0, 3.0, 3.0, 4.0, 6.0];
        let bands = compute_bollinger_bands(&sma, &closes, 2, 2.0).unwrap();
        assert_eq!(bands.upper_band.len(), 5);
        assert_eq!(bands.lower_band.len(), 5);
        for (band, src) in bands.upper_band.iter().zip(&sma) {
            assert_eq!(band.x, src.x);
        }
    }

    #[test]
    fn bollinger_is_deterministic() {
        let sma = series(&[None, Some(5.0), Some(5.5)]);
        let closes = [4.0, 6.0, 5.0];
        let a = compute_bollinger_bands(&sma, &closes, 2, 2.0).unwrap();
        let b = compute_bollinger_bands(&sma, &closes, 2, 2.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn bollinger_rejects_contract_violations() {
        let sma = series(&[None, Some(5.0)]);
        assert!(matches!(
            compute_bollinger_bands(&sma, &[4.0, 6.0], 0, 2.0),
            Err(SeriesError::InvalidPeriod { .. })
        ));
        assert!(matches!(
            compute_bollinger_bands(&sma, &[4.0], 2, 2.0),
            Err(SeriesError::LengthMismatch { .. })
        ));

        let unordered = vec![LabeledPoint::gap(day(3)), LabeledPoint::new(day(2), 5.0)];
        assert!(matches!(
            compute_bollinger_bands(&unordered, &[4.0, 6.0], 2, 2.0),
            Err(SeriesError::NonChronological { .. })
        ));
    }
}
