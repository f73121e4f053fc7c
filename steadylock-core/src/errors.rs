//! Error Types for Measurement Stabilization
//!
//! ## Design Philosophy
//!
//! Errors returned from the per-frame hot path follow the same rules as the
//! rest of the crate:
//!
//! 1. **Small Size**: variants carry only inline numbers or `&'static str`
//!    reasons, so every error is `Copy` and cheap to return once per frame.
//!
//! 2. **State Preserving**: every error is raised before any state is mutated.
//!    A caller that receives an error can keep feeding frames into the same
//!    instance.
//!
//! 3. **Actionable Information**: the variant alone tells the caller whether to
//!    drop the frame (`ValidationError`) or to `reset()` first
//!    (`LockError::AlreadyLocked`).
//!
//! ## Error Categories
//!
//! ### Input Validation
//! - `NotFinite`: NaN or infinity anywhere in the sample
//! - `NotPositive`: calibration scale factors must be strictly positive
//! - `DimensionMismatch`: vector length differs from the configured dimension
//! - `Empty`: zero-length vector
//!
//! ### Illegal State
//! - `AlreadyLocked`: a lock is terminal until `reset()`
//! - `NotInitialized`: the linear filter has no estimate before its first update
//!
//! ### Numeric Degeneracy
//! A zero-mean stability window is *not* an error. It produces an infinite
//! coefficient of variation and the frame is simply classified as unstable.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use steadylock_core::{CalibrationLock, LockError};
//!
//! let mut lock = CalibrationLock::default();
//! match lock.add_measurement(0.54) {
//!     Ok(snapshot) if snapshot.is_locked => {
//!         // commit lock.locked_scale()
//!     }
//!     Ok(_) => {
//!         // keep streaming frames
//!     }
//!     Err(LockError::Invalid(_)) => {
//!         // drop this frame, ask the camera pipeline for another
//!     }
//!     Err(LockError::AlreadyLocked) => {
//!         // session finished; lock.reset() before reuse
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type for lock and gate operations
pub type LockResult<T> = Result<T, LockError>;

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Result type for configuration checks
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Rejected input sample - state is unchanged
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ValidationError {
    /// Sample contains NaN or infinity
    #[error("Invalid value: measurement must be finite")]
    NotFinite,

    /// Scale factor at or below zero
    #[error("Invalid value: measurement must be positive, got {value}")]
    NotPositive {
        /// The rejected value
        value: f64,
    },

    /// Vector length does not match the stream dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension fixed by configuration or by the first sample of a cycle
        expected: usize,
        /// Length of the rejected sample
        actual: usize,
    },

    /// Zero-length vector
    #[error("Invalid value: measurement vector is empty")]
    Empty,
}

/// Errors raised by the stability locks and the warm-up gate
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum LockError {
    /// The sample failed validation
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The lock is terminal; `reset()` before adding measurements
    #[error("Lock already engaged. Call reset() to start a new cycle")]
    AlreadyLocked,
}

/// Errors raised by the smoothing filters
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FilterError {
    /// The sample failed validation
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// No estimate exists before the first measurement
    #[error("Filter must be initialized with a measurement first")]
    NotInitialized,

    /// Innovation covariance could not be inverted
    #[error("Innovation covariance is singular")]
    Singular,
}

/// Configuration rejected at construction time
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("Invalid configuration: {parameter} {reason}")]
pub struct ConfigError {
    /// Name of the offending field
    pub parameter: &'static str,
    /// What the field must satisfy
    pub reason: &'static str,
}

impl ConfigError {
    pub(crate) const fn new(parameter: &'static str, reason: &'static str) -> Self {
        Self { parameter, reason }
    }
}

/// Checks shared by every config `validate()`
pub(crate) mod check {
    use super::{ConfigError, ConfigResult};

    pub fn positive(value: f64, parameter: &'static str) -> ConfigResult<()> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::new(parameter, "must be positive and finite"))
        }
    }

    pub fn non_negative(value: f64, parameter: &'static str) -> ConfigResult<()> {
        if value.is_finite() && value >= 0.0 {
            Ok(())
        } else {
            Err(ConfigError::new(parameter, "must be non-negative and finite"))
        }
    }

    pub fn at_least(value: usize, min: usize, parameter: &'static str, reason: &'static str) -> ConfigResult<()> {
        if value >= min {
            Ok(())
        } else {
            Err(ConfigError::new(parameter, reason))
        }
    }
}

/// Reject empty or non-finite vectors
pub(crate) fn validate_vector(values: &[f64]) -> Result<(), ValidationError> {
    if values.is_empty() {
        return Err(ValidationError::Empty);
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::NotFinite);
    }
    Ok(())
}
