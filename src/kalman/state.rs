//! Fixed-size filter state
//!
//! The model tracks exactly two instruments, so every vector is a
//! `Vector2` and every covariance a `Matrix2`. Dimensions are checked by
//! the type system, never at runtime.

use nalgebra::{Matrix2, Vector2};

/// Posterior state of the filter
///
/// `theta = [hedge_ratio, intercept]` and its covariance `C`.
/// `C` is `None` until the first observation has been absorbed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateEstimate {
    theta: Vector2<f64>,
    posterior: Option<Matrix2<f64>>,
}

impl StateEstimate {
    /// Empty state: `theta = [0, 0]`, no prior history
    pub fn new() -> Self {
        Self {
            theta: Vector2::zeros(),
            posterior: None,
        }
    }

    /// Build a state from known parts
    pub fn from_parts(theta: Vector2<f64>, posterior: Option<Matrix2<f64>>) -> Self {
        Self { theta, posterior }
    }

    #[inline(always)]
    pub fn theta(&self) -> &Vector2<f64> {
        &self.theta
    }

    /// Posterior covariance `C` (zero before the first update)
    #[inline]
    pub fn covariance(&self) -> Matrix2<f64> {
        self.posterior.unwrap_or_else(Matrix2::zeros)
    }

    /// Whether a posterior covariance from a previous step exists
    #[inline(always)]
    pub fn has_prior(&self) -> bool {
        self.posterior.is_some()
    }

    /// Prior (predictive) covariance `R` for the next step
    ///
    /// Zero on the first step, `C + W` afterwards.
    #[inline]
    pub fn prior(&self, process_noise: &Matrix2<f64>) -> Matrix2<f64> {
        match self.posterior {
            Some(c) => c + process_noise,
            None => Matrix2::zeros(),
        }
    }

    /// Predicted observation `F · theta`
    #[inline(always)]
    pub fn predict(&self, observation: &Vector2<f64>) -> f64 {
        observation.dot(&self.theta)
    }
}

impl Default for StateEstimate {
    fn default() -> Self {
        Self::new()
    }
}

/// Observation row `F = [price_a, 1]`
#[inline(always)]
pub fn observation_vector(price_a: f64) -> Vector2<f64> {
    Vector2::new(price_a, 1.0)
}

/// Process-noise covariance `W = diag(w, w)`
#[inline]
pub fn process_noise_matrix(w: f64) -> Matrix2<f64> {
    Matrix2::from_diagonal_element(w)
}

/// Outer product `a · bᵀ`, i.e. `M[i][j] = a[i] * b[j]`
#[inline(always)]
pub fn outer(a: &Vector2<f64>, b: &Vector2<f64>) -> Matrix2<f64> {
    a * b.transpose()
}

/// Off-diagonal symmetry check
#[inline]
pub fn is_symmetric(m: &Matrix2<f64>, tolerance: f64) -> bool {
    (m[(0, 1)] - m[(1, 0)]).abs() <= tolerance
}

/// All four entries are finite
#[inline]
pub fn is_finite(m: &Matrix2<f64>) -> bool {
    m.iter().all(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_state() {
        let state = StateEstimate::new();

        assert_eq!(*state.theta(), Vector2::zeros());
        assert_eq!(state.covariance(), Matrix2::zeros());
        assert!(!state.has_prior());
    }

    #[test]
    fn test_prior_first_step_is_zero() {
        let state = StateEstimate::new();
        let w = process_noise_matrix(0.5);

        assert_eq!(state.prior(&w), Matrix2::zeros());
    }

    #[test]
    fn test_prior_adds_process_noise() {
        let c = Matrix2::new(1.0, 0.2, 0.2, 3.0);
        let state = StateEstimate::from_parts(Vector2::zeros(), Some(c));
        let w = process_noise_matrix(0.5);

        let r = state.prior(&w);
        assert_eq!(r, Matrix2::new(1.5, 0.2, 0.2, 3.5));
    }

    #[test]
    fn test_matrix_vector_product_uses_columns() {
        // R·F must mix both columns: [1*2 + 2*1, 3*2 + 4*1]
        let r = Matrix2::new(1.0, 2.0, 3.0, 4.0);
        let f = observation_vector(2.0);

        assert_eq!(r * f, Vector2::new(4.0, 10.0));
    }

    #[test]
    fn test_outer_product() {
        let a = Vector2::new(1.0, 2.0);
        let b = Vector2::new(3.0, 5.0);

        let m = outer(&a, &b);
        assert_eq!(m, Matrix2::new(3.0, 5.0, 6.0, 10.0));
    }

    #[test]
    fn test_predict() {
        let state = StateEstimate::from_parts(Vector2::new(1.5, 2.0), None);
        assert_eq!(state.predict(&observation_vector(10.0)), 17.0);
    }

    #[test]
    fn test_symmetry_and_finiteness() {
        assert!(is_symmetric(&Matrix2::new(1.0, 0.3, 0.3, 1.0), 0.0));
        assert!(!is_symmetric(&Matrix2::new(1.0, 0.3, 0.4, 1.0), 1e-9));
        assert!(is_finite(&Matrix2::identity()));
        assert!(!is_finite(&Matrix2::new(1.0, f64::NAN, 0.0, 1.0)));
    }
}
