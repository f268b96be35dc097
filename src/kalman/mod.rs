//! Kalman hedge ratio filter and multi-pair book

mod book;
mod config;
mod filter;
pub mod state;

pub use book::PairBook;
pub use config::FilterConfig;
pub use filter::{FilterOutput, FilterSnapshot, HedgeRatioFilter, size_hedge};
pub use state::StateEstimate;
