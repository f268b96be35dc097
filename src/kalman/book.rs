//! Hedge-ratio filters for many pairs
//!
//! Each registered pair owns an independent `HedgeRatioFilter` behind its
//! own mutex. The pair map is write-locked only by register and remove.
//! All updates feed one shared `Metrics` instance.

use crate::kalman::{FilterConfig, FilterOutput, HedgeRatioFilter};
use crate::utils::Metrics;
use ahash::AHashMap;
use log::info;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Instant;

/// Independent filters for many pairs
///
/// Each pair owns its filter behind its own mutex: updates to one pair
/// are serialized, updates to different pairs never contend on filter
/// state. The map lock is only held long enough to look a pair up.
pub struct PairBook {
    /// Config used by [`register`](Self::register)
    default_config: FilterConfig,

    /// Pair id -> filter
    filters: RwLock<AHashMap<String, Arc<Mutex<HedgeRatioFilter>>>>,

    /// Update metrics across all pairs
    metrics: Arc<RwLock<Metrics>>,
}

impl PairBook {
    /// Create an empty book
    pub fn new(default_config: FilterConfig) -> crate::Result<Self> {
        default_config.validate()?;

        Ok(Self {
            default_config,
            filters: RwLock::new(AHashMap::new()),
            metrics: Arc::new(RwLock::new(Metrics::new())),
        })
    }

    /// Track a new pair with the default configuration
    pub fn register(&self, pair_id: &str) -> crate::Result<()> {
        self.register_with(pair_id, self.default_config)
    }

    /// Track a new pair with its own configuration
    pub fn register_with(&self, pair_id: &str, config: FilterConfig) -> crate::Result<()> {
        let filter = HedgeRatioFilter::new(config)?;

        let mut filters = self.filters.write();
        if filters.contains_key(pair_id) {
            return Err(crate::Error::InvalidState(format!(
                "Pair {} is already registered",
                pair_id
            )));
        }
        filters.insert(pair_id.to_string(), Arc::new(Mutex::new(filter)));

        info!(
            "Registered pair {} (delta={}, v={}, qty={})",
            pair_id, config.delta, config.observation_noise_variance, config.quantity_scale
        );
        Ok(())
    }

    /// Stop tracking a pair
    pub fn remove(&self, pair_id: &str) -> crate::Result<()> {
        self.filters
            .write()
            .remove(pair_id)
            .map(|_| ())
            .ok_or_else(|| crate::Error::UnknownPair(pair_id.to_string()))
    }

    /// Feed one aligned bar to a pair's filter
    pub fn update(&self, pair_id: &str, price_a: f64, price_b: f64) -> crate::Result<FilterOutput> {
        let filter = self.filter(pair_id)?;

        let start = Instant::now();
        let result = filter.lock().update(price_a, price_b);
        let latency_ns = start.elapsed().as_nanos() as u64;

        let mut metrics = self.metrics.write();
        match &result {
            Ok(_) => metrics.record_update_latency(latency_ns),
            Err(crate::Error::InvalidInput(_)) => metrics.record_rejected_input(),
            Err(crate::Error::NumericalBreakdown { .. }) => metrics.record_breakdown(),
            Err(_) => {}
        }

        result
    }

    /// Re-initialize a pair's filter
    pub fn reset(&self, pair_id: &str) -> crate::Result<()> {
        self.filter(pair_id)?.lock().reset();
        info!("Reset pair {}", pair_id);
        Ok(())
    }

    /// Current hedge ratio of a pair
    pub fn hedge_ratio(&self, pair_id: &str) -> crate::Result<f64> {
        Ok(self.filter(pair_id)?.lock().hedge_ratio())
    }

    /// Copy of a pair's filter
    pub fn filter_state(&self, pair_id: &str) -> crate::Result<HedgeRatioFilter> {
        Ok(self.filter(pair_id)?.lock().clone())
    }

    /// Registered pair ids, sorted
    pub fn pair_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.filters.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.filters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.read().is_empty()
    }

    /// Get metrics
    pub fn metrics(&self) -> Metrics {
        self.metrics.read().clone()
    }

    fn filter(&self, pair_id: &str) -> crate::Result<Arc<Mutex<HedgeRatioFilter>>> {
        self.filters
            .read()
            .get(pair_id)
            .cloned()
            .ok_or_else(|| crate::Error::UnknownPair(pair_id.to_string()))
    }
}
