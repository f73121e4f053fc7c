//! Constant-Position Kalman Filter for Shape Vectors
//!
//! ## Overview
//!
//! Smooths a fixed-dimension measurement vector (ten body-shape parameters
//! for a scan session) and tracks how certain each component is. The
//! state is assumed not to move between frames, so both the transition and
//! the measurement model are the identity.
//!
//! ## Kalman Filter Theory
//!
//! ### 1. Prediction Step
//! ```text
//! State prediction:      x̂ₖ|ₖ₋₁ = F·xₖ₋₁          (F = I)
//! Covariance prediction: Pₖ|ₖ₋₁ = F·Pₖ₋₁·Fᵀ + Q   (Q = q·I)
//! ```
//!
//! ### 2. Update Step
//! ```text
//! Innovation:      yₖ = zₖ - H·x̂ₖ|ₖ₋₁            (H = I)
//! Innovation cov:  Sₖ = H·Pₖ|ₖ₋₁·Hᵀ + R          (R = r·I)
//! Kalman gain:     Kₖ = Pₖ|ₖ₋₁·Hᵀ·Sₖ⁻¹
//! State update:    x̂ₖ = x̂ₖ|ₖ₋₁ + Kₖ·yₖ
//! Covariance:      Pₖ = (I - Kₖ·H)·Pₖ|ₖ₋₁·(I - Kₖ·H)ᵀ + Kₖ·R·Kₖᵀ
//! ```
//!
//! The covariance uses the Joseph form and is re-symmetrized after every
//! step, so it stays symmetric positive semi-definite under rounding.
//!
//! ## Lifecycle
//!
//! ```text
//! uninitialized --update(z)--> seeded: x = z, P = p0·I
//! seeded --update(z)--> predict + correct
//! seeded --predict()--> P += Q (uncertainty grows)
//! any --reset()--> uninitialized
//! ```
//!
//! Every update is computed into locals and committed only on success. A
//! rejected measurement or a singular innovation covariance leaves the
//! previous estimate in place.
//!
//! ## Usage Example
//!
//! ```rust
//! use steadylock_core::filters::{KalmanConfig, ShapeFilter};
//!
//! let mut filter = ShapeFilter::new(KalmanConfig::default())?;
//! let betas = [0.3, -0.1, 0.05, 0.0, 0.2, 0.1, -0.3, 0.0, 0.1, 0.02];
//!
//! let estimate = filter.update(&betas)?;
//! assert_eq!(estimate.state, betas);
//!
//! filter.update(&betas)?;
//! assert!(filter.max_uncertainty()? < 1.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    constants::{KALMAN_INITIAL_UNCERTAINTY, KALMAN_MEASUREMENT_NOISE, KALMAN_PROCESS_NOISE, SHAPE_DIMENSION},
    errors::{check, validate_vector, ConfigResult, FilterError, FilterResult, ValidationError},
    filters::matrix::{
        add, congruence, identity, invert, make_symmetric, matvec, multiply, scaled_identity, subtract, transpose,
        SquareMatrix, Vector,
    },
};

/// Kalman filter noise parameters
///
/// Each value scales an identity matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanConfig {
    /// Process noise (Q = q·I); higher = less trust in the constant model
    pub process_noise: f64,
    /// Measurement noise (R = r·I); higher = less trust in measurements
    pub measurement_noise: f64,
    /// Covariance diagonal seeded by the first measurement
    pub initial_uncertainty: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            process_noise: KALMAN_PROCESS_NOISE,
            measurement_noise: KALMAN_MEASUREMENT_NOISE,
            initial_uncertainty: KALMAN_INITIAL_UNCERTAINTY,
        }
    }
}

impl KalmanConfig {
    /// Set process noise
    pub fn with_process_noise(mut self, noise: f64) -> Self {
        self.process_noise = noise;
        self
    }

    /// Set measurement noise
    pub fn with_measurement_noise(mut self, noise: f64) -> Self {
        self.measurement_noise = noise;
        self
    }

    /// Set initial uncertainty
    pub fn with_initial_uncertainty(mut self, uncertainty: f64) -> Self {
        self.initial_uncertainty = uncertainty;
        self
    }

    /// Range-check every field
    pub fn validate(&self) -> ConfigResult<()> {
        check::positive(self.process_noise, "process_noise")?;
        check::positive(self.measurement_noise, "measurement_noise")?;
        check::positive(self.initial_uncertainty, "initial_uncertainty")
    }
}

/// State estimate and its covariance after a filter step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanEstimate<const D: usize> {
    /// Estimated state vector
    pub state: Vector<D>,
    /// Estimation error covariance
    pub covariance: SquareMatrix<D>,
}

impl<const D: usize> KalmanEstimate<D> {
    /// Per-dimension standard deviation
    pub fn uncertainty(&self) -> Vector<D> {
        let mut sigma = [0.0; D];
        for (i, s) in sigma.iter_mut().enumerate() {
            *s = self.covariance[i][i].max(0.0).sqrt();
        }
        sigma
    }
}

/// Linear state filter over a `D`-dimensional vector
///
/// ## Type Parameters
/// - `D`: state and measurement dimension
#[derive(Debug, Clone)]
pub struct LinearStateFilter<const D: usize> {
    config: KalmanConfig,
    /// Current estimate, `None` until the first update
    estimate: Option<KalmanEstimate<D>>,
    /// State transition (F)
    transition: SquareMatrix<D>,
    /// Measurement matrix (H)
    observation: SquareMatrix<D>,
    /// Process noise covariance (Q)
    process_noise: SquareMatrix<D>,
    /// Measurement noise covariance (R)
    measurement_noise: SquareMatrix<D>,
    update_count: u32,
}

/// Kalman filter sized for the 10 body-shape parameters
pub type ShapeFilter = LinearStateFilter<SHAPE_DIMENSION>;

impl<const D: usize> LinearStateFilter<D> {
    /// Create an uninitialized filter after validating its configuration
    pub fn new(config: KalmanConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            estimate: None,
            transition: identity(),
            observation: identity(),
            process_noise: scaled_identity(config.process_noise),
            measurement_noise: scaled_identity(config.measurement_noise),
            update_count: 0,
        })
    }

    /// Filter configuration
    pub fn config(&self) -> &KalmanConfig {
        &self.config
    }

    /// Fold one measurement into the estimate
    ///
    /// The first measurement seeds the state. Length must equal `D`.
    pub fn update(&mut self, measurement: &[f64]) -> FilterResult<KalmanEstimate<D>> {
        let z = Self::validate(measurement)?;

        let next = match &self.estimate {
            None => KalmanEstimate {
                state: z,
                covariance: scaled_identity(self.config.initial_uncertainty),
            },
            Some(current) => {
                let predicted = self.propagate(current);
                self.correct(&predicted, &z)?
            }
        };

        self.estimate = Some(next);
        self.update_count = self.update_count.saturating_add(1);
        Ok(next)
    }

    /// Advance one frame without a measurement
    ///
    /// The inflated covariance is kept, so skipped frames make the estimate
    /// less certain.
    pub fn predict(&mut self) -> FilterResult<KalmanEstimate<D>> {
        let current = self.estimate.as_ref().ok_or(FilterError::NotInitialized)?;
        let predicted = self.propagate(current);
        self.estimate = Some(predicted);
        Ok(predicted)
    }

    /// Prediction: x = F·x, P = F·P·Fᵀ + Q
    fn propagate(&self, current: &KalmanEstimate<D>) -> KalmanEstimate<D> {
        let state = matvec(&self.transition, &current.state);
        let mut covariance = add(&congruence(&self.transition, &current.covariance), &self.process_noise);
        make_symmetric(&mut covariance);
        KalmanEstimate { state, covariance }
    }

    /// Correction with the Joseph-form covariance update
    fn correct(&self, predicted: &KalmanEstimate<D>, z: &Vector<D>) -> FilterResult<KalmanEstimate<D>> {
        let h = &self.observation;
        let h_t = transpose(h);

        // Innovation: y = z - H·x̂
        let h_x = matvec(h, &predicted.state);
        let mut innovation = [0.0; D];
        for i in 0..D {
            innovation[i] = z[i] - h_x[i];
        }

        // Innovation covariance: S = H·P·Hᵀ + R
        let s = add(&congruence(h, &predicted.covariance), &self.measurement_noise);
        let s_inv = match invert(&s) {
            Some(inv) => inv,
            None => {
                log::warn!("Innovation covariance is singular, keeping previous estimate");
                return Err(FilterError::Singular);
            }
        };

        // Kalman gain: K = P·Hᵀ·S⁻¹
        let gain = multiply(&multiply(&predicted.covariance, &h_t), &s_inv);

        // State update: x̂ = x̂ + K·y
        let correction = matvec(&gain, &innovation);
        let mut state = predicted.state;
        for i in 0..D {
            state[i] += correction[i];
        }

        // P = (I - K·H)·P·(I - K·H)ᵀ + K·R·Kᵀ
        let i_kh = subtract(&identity(), &multiply(&gain, h));
        let mut covariance = add(
            &congruence(&i_kh, &predicted.covariance),
            &congruence(&gain, &self.measurement_noise),
        );
        make_symmetric(&mut covariance);

        Ok(KalmanEstimate { state, covariance })
    }

    fn validate(measurement: &[f64]) -> Result<Vector<D>, ValidationError> {
        if measurement.len() != D {
            return Err(ValidationError::DimensionMismatch {
                expected: D,
                actual: measurement.len(),
            });
        }
        validate_vector(measurement)?;

        let mut z = [0.0; D];
        z.copy_from_slice(measurement);
        Ok(z)
    }

    /// Per-dimension standard deviation, √diag(P)
    pub fn uncertainty(&self) -> FilterResult<Vector<D>> {
        self.estimate
            .as_ref()
            .map(KalmanEstimate::uncertainty)
            .ok_or(FilterError::NotInitialized)
    }

    /// Mean of the per-dimension standard deviations
    pub fn mean_uncertainty(&self) -> FilterResult<f64> {
        let sigma = self.uncertainty()?;
        Ok(sigma.iter().sum::<f64>() / D.max(1) as f64)
    }

    /// Largest per-dimension standard deviation
    pub fn max_uncertainty(&self) -> FilterResult<f64> {
        let sigma = self.uncertainty()?;
        Ok(sigma.iter().fold(0.0f64, |max, &s| max.max(s)))
    }

    /// Current state estimate, if seeded
    pub fn state(&self) -> Option<&Vector<D>> {
        self.estimate.as_ref().map(|e| &e.state)
    }

    /// Current covariance, if seeded
    pub fn covariance(&self) -> Option<&SquareMatrix<D>> {
        self.estimate.as_ref().map(|e| &e.covariance)
    }

    /// Number of accepted measurements since the last reset
    pub fn update_count(&self) -> u32 {
        self.update_count
    }

    /// Whether a measurement has seeded the state
    pub fn is_initialized(&self) -> bool {
        self.estimate.is_some()
    }

    /// Return to the uninitialized state
    pub fn reset(&mut self) {
        self.estimate = None;
        self.update_count = 0;
    }
}
