//! Utility functions and helpers

mod metrics;

pub use metrics::{Metrics, MetricsSummary};
