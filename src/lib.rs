//! # Kalman Pairs
//!
//! Dynamic hedge ratio estimation for pairs trading with a bivariate
//! Kalman filter.
//!
//! ## Features
//!
//! - Fixed-size 2x2 state recursion (no heap allocation per update)
//! - Explicit first-step handling and numerical breakdown detection
//! - Integer unit sizing of the second leg
//! - Independent filters for many pairs
//! - Spread z-score entry/exit signal
//!
//! ## Quick Start
//!
//! ```
//! use kalman_pairs::*;
//!
//! let mut filter = HedgeRatioFilter::new(FilterConfig::default())?;
//! let out = filter.update(100.0, 100.0)?;
//! println!("et={} sqrt(Qt)={} qty={}", out.forecast_error, out.forecast_std_dev, out.hedge_quantity);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod kalman;
pub mod market_data;
pub mod signal;
pub mod utils;

// Re-exports
pub use kalman::{
    FilterConfig, FilterOutput, FilterSnapshot, HedgeRatioFilter, PairBook, size_hedge,
};
pub use market_data::{PriceBar, PricePair, align_series, load_pair_csv, parse_pair_csv};
pub use signal::{PairTrade, SignalConfig, SpreadPosition, SpreadSignal, TradeAction};
pub use utils::Metrics;

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Numerical breakdown: innovation variance {innovation_variance}")]
    NumericalBreakdown { innovation_variance: f64 },

    #[error("Unknown pair: {0}")]
    UnknownPair(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}
