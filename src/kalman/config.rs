use serde::{Deserialize, Serialize};
use std::path::Path;

/// Filter configuration
///
/// Fixed for the lifetime of a filter. None of these values are
/// estimated from data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Process-noise scale (0 < delta < 1)
    /// Higher = hedge ratio adapts faster, noisier estimates
    pub delta: f64,

    /// Observation-noise variance (v > 0)
    /// Higher = new observations are trusted less
    pub observation_noise_variance: f64,

    /// Multiplier turning the hedge ratio into a unit count
    /// for the second leg
    pub quantity_scale: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            delta: 0.0001,
            observation_noise_variance: 0.001,
            quantity_scale: 2000.0,
        }
    }
}

impl FilterConfig {
    /// Create a configuration from explicit values
    pub fn new(delta: f64, observation_noise_variance: f64, quantity_scale: f64) -> Self {
        Self {
            delta,
            observation_noise_variance,
            quantity_scale,
        }
    }

    /// Diagonal entry of the process-noise covariance W
    ///
    /// w = delta / (1 - delta)
    #[inline]
    pub fn process_noise(&self) -> f64 {
        self.delta / (1.0 - self.delta)
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if !(self.delta > 0.0 && self.delta < 1.0) {
            return Err(crate::Error::Config(format!(
                "delta must be in (0, 1), got {}",
                self.delta
            )));
        }

        // v > 0 keeps Qt strictly positive, so the gain is always defined
        if !(self.observation_noise_variance > 0.0 && self.observation_noise_variance.is_finite()) {
            return Err(crate::Error::Config(format!(
                "Observation noise variance must be finite and positive, got {}",
                self.observation_noise_variance
            )));
        }

        if !self.quantity_scale.is_finite() {
            return Err(crate::Error::Config(
                "Quantity scale must be finite".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration
    ///
    /// Missing fields take their default values.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        let config: FilterConfig = serde_json::from_str(json)
            .map_err(|e| crate::Error::Config(format!("Invalid filter config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }
}
