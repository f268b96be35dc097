//! Filter update metrics

use serde::{Deserialize, Serialize};

/// Update counters and latency statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// Successful filter updates
    updates_processed: usize,

    /// Calls rejected for non-finite prices
    rejected_inputs: usize,

    /// Calls failed with negative innovation variance or non-finite state
    numerical_breakdowns: usize,

    /// Sum of update latencies (for average)
    total_latency_ns: u64,

    min_latency_ns: u64,

    max_latency_ns: u64,

    latency_histogram: LatencyHistogram,
}

impl Metrics {
    /// Create new metrics
    pub fn new() -> Self {
        Self {
            updates_processed: 0,
            rejected_inputs: 0,
            numerical_breakdowns: 0,
            total_latency_ns: 0,
            min_latency_ns: u64::MAX,
            max_latency_ns: 0,
            latency_histogram: LatencyHistogram::new(),
        }
    }

    /// Record a successful update and its latency
    pub fn record_update_latency(&mut self, latency_ns: u64) {
        self.updates_processed += 1;
        self.total_latency_ns += latency_ns;
        self.min_latency_ns = self.min_latency_ns.min(latency_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
        self.latency_histogram.record(latency_ns);
    }

    pub fn record_rejected_input(&mut self) {
        self.rejected_inputs += 1;
    }

    pub fn record_breakdown(&mut self) {
        self.numerical_breakdowns += 1;
    }

    pub fn updates_processed(&self) -> usize {
        self.updates_processed
    }

    pub fn rejected_inputs(&self) -> usize {
        self.rejected_inputs
    }

    pub fn numerical_breakdowns(&self) -> usize {
        self.numerical_breakdowns
    }

    /// Average update latency (nanoseconds)
    pub fn avg_latency_ns(&self) -> u64 {
        if self.updates_processed == 0 {
            0
        } else {
            self.total_latency_ns / self.updates_processed as u64
        }
    }

    /// Minimum update latency (0 when nothing recorded)
    pub fn min_latency_ns(&self) -> u64 {
        if self.min_latency_ns == u64::MAX {
            0
        } else {
            self.min_latency_ns
        }
    }

    pub fn max_latency_ns(&self) -> u64 {
        self.max_latency_ns
    }

    /// Upper bound of the bucket holding the given percentile
    pub fn latency_percentile(&self, percentile: f64) -> u64 {
        self.latency_histogram.percentile(percentile)
    }

    /// Reset metrics
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Get summary statistics
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            updates_processed: self.updates_processed,
            rejected_inputs: self.rejected_inputs,
            numerical_breakdowns: self.numerical_breakdowns,
            avg_latency_ns: self.avg_latency_ns(),
            min_latency_ns: self.min_latency_ns(),
            max_latency_ns: self.max_latency_ns(),
            p50_latency_ns: self.latency_percentile(0.50),
            p99_latency_ns: self.latency_percentile(0.99),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics summary for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub updates_processed: usize,
    pub rejected_inputs: usize,
    pub numerical_breakdowns: usize,
    pub avg_latency_ns: u64,
    pub min_latency_ns: u64,
    pub max_latency_ns: u64,
    pub p50_latency_ns: u64,
    pub p99_latency_ns: u64,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Filter Metrics:")?;
        writeln!(f, "  Updates:              {}", self.updates_processed)?;
        writeln!(f, "  Rejected inputs:      {}", self.rejected_inputs)?;
        writeln!(f, "  Numerical breakdowns: {}", self.numerical_breakdowns)?;
        writeln!(f, "\nUpdate Latency:")?;
        writeln!(f, "  Average:  {} ns", self.avg_latency_ns)?;
        writeln!(f, "  Minimum:  {} ns", self.min_latency_ns)?;
        writeln!(f, "  P50:      <= {} ns", self.p50_latency_ns)?;
        writeln!(f, "  P99:      <= {} ns", self.p99_latency_ns)?;
        writeln!(f, "  Maximum:  {} ns", self.max_latency_ns)?;
        Ok(())
    }
}

/// Power-of-two latency buckets: [0, 64ns), [64, 128ns), ... , >= 2^20 ns
const BUCKET_COUNT: usize = 16;
const FIRST_BOUND_NS: u64 = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LatencyHistogram {
    buckets: [usize; BUCKET_COUNT],
}

impl LatencyHistogram {
    fn new() -> Self {
        Self {
            buckets: [0; BUCKET_COUNT],
        }
    }

    fn upper_bound(bucket: usize) -> u64 {
        FIRST_BOUND_NS << bucket
    }

    fn record(&mut self, latency_ns: u64) {
        let bucket = (0..BUCKET_COUNT - 1)
            .find(|&i| latency_ns < Self::upper_bound(i))
            .unwrap_or(BUCKET_COUNT - 1);
        self.buckets[bucket] += 1;
    }

    fn percentile(&self, p: f64) -> u64 {
        let total: usize = self.buckets.iter().sum();
        if total == 0 {
            return 0;
        }

        let target = ((total as f64 * p).ceil() as usize).max(1);
        let mut cumsum = 0;

        for (i, &count) in self.buckets.iter().enumerate() {
            cumsum += count;
            if cumsum >= target {
                return Self::upper_bound(i);
            }
        }

        Self::upper_bound(BUCKET_COUNT - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_basic() {
        let mut metrics = Metrics::new();

        metrics.record_update_latency(100);
        metrics.record_update_latency(200);
        metrics.record_update_latency(150);

        assert_eq!(metrics.updates_processed(), 3);
        assert_eq!(metrics.avg_latency_ns(), 150);
        assert_eq!(metrics.min_latency_ns(), 100);
        assert_eq!(metrics.max_latency_ns(), 200);
    }

    #[test]
    fn test_failure_counters() {
        let mut metrics = Metrics::new();

        metrics.record_rejected_input();
        metrics.record_breakdown();
        metrics.record_breakdown();

        let summary = metrics.summary();
        assert_eq!(summary.rejected_inputs, 1);
        assert_eq!(summary.numerical_breakdowns, 2);
        assert_eq!(summary.updates_processed, 0);
        assert_eq!(summary.min_latency_ns, 0);
    }

    #[test]
    fn test_histogram_percentile() {
        let mut metrics = Metrics::new();

        for i in 0..100 {
            metrics.record_update_latency(i * 10);
        }

        let p50 = metrics.latency_percentile(0.50);
        let p99 = metrics.latency_percentile(0.99);

        // 50th sample is 490ns -> [256, 512) bucket
        assert_eq!(p50, 512);
        assert_eq!(p99, 1024);
    }

    #[test]
    fn test_reset() {
        let mut metrics = Metrics::new();
        metrics.record_update_latency(42);
        metrics.reset();

        assert_eq!(metrics.updates_processed(), 0);
        assert_eq!(metrics.latency_percentile(0.5), 0);
    }
}
