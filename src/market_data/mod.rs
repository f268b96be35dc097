//! Aligned price input for the filter

mod bars;

pub use bars::{PriceBar, PricePair, align_series, load_pair_csv, parse_pair_csv};
