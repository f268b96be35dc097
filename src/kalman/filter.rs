//! Bivariate Kalman filter for a dynamic hedge ratio
//!
//! # Model
//!
//! ```text
//! theta[t] = theta[t-1] + w,      w ~ N(0, W),  W = diag(δ/(1-δ), δ/(1-δ))
//! priceB[t] = F[t] · theta[t] + e, e ~ N(0, v),  F[t] = [priceA[t], 1]
//! ```
//!
//! `theta = [hedge_ratio, intercept]`.
//!
//! # Example
//! ```
//! use kalman_pairs::{FilterConfig, HedgeRatioFilter};
//!
//! let mut filter = HedgeRatioFilter::new(FilterConfig::default())?;
//!
//! let first = filter.update(100.0, 100.0)?;
//! assert_eq!(first.forecast_error, 100.0);
//! assert_eq!(first.hedge_quantity, 0.0);
//!
//! let second = filter.update(101.0, 102.0)?;
//! assert!(second.hedge_quantity > 2000.0);
//! # Ok::<(), kalman_pairs::Error>(())
//! ```

use crate::kalman::FilterConfig;
use crate::kalman::state::{
    StateEstimate, is_finite, is_symmetric, observation_vector, outer, process_noise_matrix,
};
use log::{debug, warn};
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

/// Per-step filter output
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterOutput {
    /// Innovation `et = priceB - F · theta` (before the update)
    pub forecast_error: f64,

    /// Predictive standard deviation `sqrt(Qt)`
    pub forecast_std_dev: f64,

    /// `floor(quantity_scale * hedge_ratio)` after the update
    pub hedge_quantity: f64,
}

impl FilterOutput {
    /// Forecast error in units of its standard deviation
    #[inline]
    pub fn z_score(&self) -> f64 {
        if self.forecast_std_dev == 0.0 {
            return 0.0;
        }
        self.forecast_error / self.forecast_std_dev
    }
}

static_assertions::const_assert_eq!(std::mem::size_of::<FilterOutput>(), 24);

/// Position size for the second leg
///
/// Truncates toward negative infinity: fractional units are never traded.
#[inline(always)]
pub fn size_hedge(quantity_scale: f64, hedge_ratio: f64) -> f64 {
    (quantity_scale * hedge_ratio).floor()
}

/// Kalman filter tracking `priceB ≈ hedge_ratio * priceA + intercept`
///
/// One instance per pair. Calls to [`update`](Self::update) must be made in
/// chronological order; the filter has no notion of time and cannot detect
/// reordering.
#[derive(Debug, Clone)]
pub struct HedgeRatioFilter {
    config: FilterConfig,

    /// W, constant for the filter lifetime
    process_noise: Matrix2<f64>,

    /// theta and C
    state: StateEstimate,

    /// R used by the most recent update
    last_prior: Option<Matrix2<f64>>,

    /// Number of successful updates
    steps: u64,
}

impl HedgeRatioFilter {
    /// Create a filter with `theta = [0, 0]` and no prior covariance
    pub fn new(config: FilterConfig) -> crate::Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            process_noise: process_noise_matrix(config.process_noise()),
            state: StateEstimate::new(),
            last_prior: None,
            steps: 0,
        })
    }

    /// Create a filter seeded with a known state
    ///
    /// `covariance = None` means the next update is treated as the first.
    pub fn with_state(
        config: FilterConfig,
        theta: Vector2<f64>,
        covariance: Option<Matrix2<f64>>,
    ) -> crate::Result<Self> {
        if !theta.iter().all(|x| x.is_finite()) || !covariance.as_ref().is_none_or(is_finite) {
            return Err(crate::Error::InvalidState(
                "Seed state must be finite".to_string(),
            ));
        }

        let mut filter = Self::new(config)?;
        filter.state = StateEstimate::from_parts(theta, covariance);
        Ok(filter)
    }

    /// Absorb one aligned price pair
    ///
    /// On error nothing is mutated: all intermediate values live in locals
    /// and the state is committed only once every check has passed.
    ///
    /// # Errors
    /// - [`Error::InvalidInput`](crate::Error::InvalidInput) for NaN/infinite prices
    /// - [`Error::NumericalBreakdown`](crate::Error::NumericalBreakdown) when the
    ///   innovation variance goes negative or the recursion produces non-finite values
    pub fn update(&mut self, price_a: f64, price_b: f64) -> crate::Result<FilterOutput> {
        if !price_a.is_finite() || !price_b.is_finite() {
            warn!(
                "Rejected non-finite prices at step {}: a={}, b={}",
                self.steps, price_a, price_b
            );
            return Err(crate::Error::InvalidInput(format!(
                "Prices must be finite, got a={}, b={}",
                price_a, price_b
            )));
        }

        let f: Vector2<f64> = observation_vector(price_a);
        let y: f64 = price_b;

        let r: Matrix2<f64> = self.state.prior(&self.process_noise);

        let y_hat: f64 = self.state.predict(&f);
        let et: f64 = y - y_hat;

        // Qt = F·R·Fᵀ + v
        let fr: Vector2<f64> = r * f;
        let qt: f64 = f.dot(&fr) + self.config.observation_noise_variance;

        if !(qt >= 0.0) || !qt.is_finite() {
            warn!(
                "Numerical breakdown at step {}: innovation variance {}",
                self.steps, qt
            );
            return Err(crate::Error::NumericalBreakdown {
                innovation_variance: qt,
            });
        }
        let sqrt_qt: f64 = qt.sqrt();

        let gain: Vector2<f64> = fr / qt;

        let theta: Vector2<f64> = self.state.theta() + gain * et;
        let c: Matrix2<f64> = r - outer(&gain, &fr);

        if !theta.iter().all(|x| x.is_finite()) || !is_finite(&c) {
            warn!("Numerical breakdown at step {}: non-finite state", self.steps);
            return Err(crate::Error::NumericalBreakdown {
                innovation_variance: qt,
            });
        }

        let hedge_quantity = size_hedge(self.config.quantity_scale, theta[0]);

        self.state = StateEstimate::from_parts(theta, Some(c));
        self.last_prior = Some(r);
        self.steps += 1;

        debug!(
            "step={} et={:.6} sqrt_qt={:.6} beta={:.6} alpha={:.6} qty={}",
            self.steps, et, sqrt_qt, theta[0], theta[1], hedge_quantity
        );

        Ok(FilterOutput {
            forecast_error: et,
            forecast_std_dev: sqrt_qt,
            hedge_quantity,
        })
    }

    /// Drop all history: `theta = [0, 0]`, next update is a first step
    pub fn reset(&mut self) {
        self.state = StateEstimate::new();
        self.last_prior = None;
        self.steps = 0;
    }

    /// Current hedge ratio (theta[0])
    #[inline(always)]
    pub fn hedge_ratio(&self) -> f64 {
        self.state.theta()[0]
    }

    /// Current intercept (theta[1])
    #[inline(always)]
    pub fn intercept(&self) -> f64 {
        self.state.theta()[1]
    }

    #[inline]
    pub fn theta(&self) -> Vector2<f64> {
        *self.state.theta()
    }

    /// Posterior covariance C (zero before the first update)
    #[inline]
    pub fn covariance(&self) -> Matrix2<f64> {
        self.state.covariance()
    }

    /// Prior covariance R used by the most recent update
    #[inline]
    pub fn last_prior(&self) -> Option<Matrix2<f64>> {
        self.last_prior
    }

    /// Whether the next update will add process noise to an existing C
    #[inline]
    pub fn has_prior(&self) -> bool {
        self.state.has_prior()
    }

    /// Sizing for the current hedge ratio
    #[inline]
    pub fn hedge_quantity(&self) -> f64 {
        size_hedge(self.config.quantity_scale, self.hedge_ratio())
    }

    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Process-noise covariance W
    pub fn process_noise(&self) -> Matrix2<f64> {
        self.process_noise
    }

    /// Capture the full filter state
    pub fn snapshot(&self) -> FilterSnapshot {
        let theta = self.state.theta();
        let covariance = if self.state.has_prior() {
            let c = self.state.covariance();
            Some([[c[(0, 0)], c[(0, 1)]], [c[(1, 0)], c[(1, 1)]]])
        } else {
            None
        };

        FilterSnapshot {
            config: self.config,
            theta: [theta[0], theta[1]],
            covariance,
            steps: self.steps,
        }
    }

    /// Rebuild a filter from a snapshot
    ///
    /// `last_prior` is not part of the snapshot and starts empty. A stored
    /// covariance must be symmetric with a non-negative diagonal.
    pub fn from_snapshot(snapshot: &FilterSnapshot) -> crate::Result<Self> {
        let theta = Vector2::new(snapshot.theta[0], snapshot.theta[1]);
        let covariance = snapshot
            .covariance
            .map(|c| Matrix2::new(c[0][0], c[0][1], c[1][0], c[1][1]));

        if let Some(c) = covariance.as_ref().filter(|c| is_finite(c)) {
            if !is_symmetric(c, 1e-9 * c.amax().max(1.0)) {
                return Err(crate::Error::Snapshot(format!(
                    "Covariance is not symmetric: {} vs {}",
                    c[(0, 1)],
                    c[(1, 0)]
                )));
            }
            if c[(0, 0)] < 0.0 || c[(1, 1)] < 0.0 {
                return Err(crate::Error::Snapshot(format!(
                    "Covariance has a negative variance: [{}, {}]",
                    c[(0, 0)],
                    c[(1, 1)]
                )));
            }
        }

        let mut filter = Self::with_state(snapshot.config, theta, covariance)?;
        filter.steps = snapshot.steps;
        Ok(filter)
    }
}

/// Serializable filter state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSnapshot {
    pub config: FilterConfig,

    /// [hedge_ratio, intercept]
    pub theta: [f64; 2],

    /// Posterior covariance, row-major
    pub covariance: Option<[[f64; 2]; 2]>,

    pub steps: u64,
}

impl FilterSnapshot {
    /// Encode with bincode
    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| crate::Error::Snapshot(e.to_string()))
    }

    /// Decode from bincode
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        bincode::deserialize(bytes).map_err(|e| crate::Error::Snapshot(e.to_string()))
    }
}
