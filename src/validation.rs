// =============================================================================
// Input contract checks
// =============================================================================
//
// The calculators are total over well-formed input. These checks reject the
// malformed cases up front so a caller bug fails loudly instead of drawing a
// plausible but wrong chart.

use chrono::{Days, NaiveDate};

use crate::error::SeriesError;

/// Reject a zero look-back period.
pub fn ensure_period(name: &'static str, period: usize) -> Result<(), SeriesError> {
    if period == 0 {
        return Err(SeriesError::InvalidPeriod { name });
    }
    Ok(())
}

/// Reject keys that are out of order or duplicated.
pub fn ensure_chronological<I>(series: &'static str, keys: I) -> Result<(), SeriesError>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut previous: Option<NaiveDate> = None;
    for (index, current) in keys.into_iter().enumerate() {
        if let Some(prev) = previous {
            if current <= prev {
                return Err(SeriesError::NonChronological {
                    series,
                    index,
                    previous: prev,
                    current,
                });
            }
        }
        previous = Some(current);
    }
    Ok(())
}

/// Calendar-day addition that reports overflow as a contract error.
pub fn add_days(from: NaiveDate, days: u64) -> Result<NaiveDate, SeriesError> {
    from.checked_add_days(Days::new(days))
        .ok_or(SeriesError::DateOverflow { from, days })
}
