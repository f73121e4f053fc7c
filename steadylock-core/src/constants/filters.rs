//! Smoothing Filter Parameters
//!
//! Defaults for the speed-adaptive exponential smoother and the
//! constant-position linear filter.

// ===== ADAPTIVE (ONE EURO) FILTER =====

/// Nominal frame rate of the capture pipeline (Hz).
///
/// Informational only: the filter derives Δt from frame timestamps.
pub const ONE_EURO_FREQUENCY_HZ: f64 = 30.0;

/// Minimum cutoff frequency (Hz).
///
/// Lower values smooth more at rest at the cost of lag when motion starts.
pub const ONE_EURO_MIN_CUTOFF_HZ: f64 = 1.0;

/// Speed coefficient.
///
/// Effective cutoff = min_cutoff + beta × |smoothed derivative|. Tuned small
/// because pose channels are radians and move slowly during a scan.
pub const ONE_EURO_BETA: f64 = 0.005;

/// Cutoff used when low-passing the derivative estimate (Hz).
pub const ONE_EURO_DERIVATIVE_CUTOFF_HZ: f64 = 1.0;

// ===== LINEAR (KALMAN) FILTER =====

/// Process noise scale (Q = q × I). Higher lets the state drift more.
pub const KALMAN_PROCESS_NOISE: f64 = 0.01;

/// Measurement noise scale (R = r × I). Higher trusts measurements less.
pub const KALMAN_MEASUREMENT_NOISE: f64 = 0.1;

/// Initial covariance diagonal seeded on the first measurement.
pub const KALMAN_INITIAL_UNCERTAINTY: f64 = 1.0;

// ===== STREAM SHAPES =====

/// Body-shape parameter vector length.
pub const SHAPE_DIMENSION: usize = 10;

/// Joints in a full-body pose, three axis-angle channels each.
pub const POSE_JOINT_COUNT: usize = 24;
