// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator calculators. Short lookback is never an
// error: it shows up as `None` points. Only malformed input (zero periods,
// unordered keys, mismatched lengths) is rejected with a `SeriesError`.

pub mod bollinger;
pub mod ichimoku;
pub mod sma;

pub use bollinger::{compute_bollinger_bands, DEFAULT_MULTIPLIER};
pub use ichimoku::{compute_ichimoku, IchimokuLines, IchimokuParams};
pub use sma::calculate_sma;
