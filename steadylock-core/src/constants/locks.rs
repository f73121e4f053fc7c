//! Stability Lock Parameters
//!
//! Thresholds for deciding when a stream is trustworthy enough to commit a
//! value, and budgets for the robust estimator run at lock time.

// ===== CALIBRATION (SCALAR) LOCK =====

/// Coefficient of variation at or below which a calibration frame is stable.
///
/// 5% relative dispersion of the scale factor over the window.
pub const CALIBRATION_CV_THRESHOLD: f64 = 0.05;

/// Consecutive stable frames needed to lock calibration.
///
/// About one second at 30 fps.
pub const CALIBRATION_STABLE_FRAMES: u32 = 30;

/// Sliding window length for the calibration CV.
pub const CALIBRATION_WINDOW_SIZE: usize = 10;

/// Samples required before calibration CV is evaluated.
pub const CALIBRATION_MIN_MEASUREMENTS: usize = 2;

// ===== MEASUREMENT (VECTOR) LOCK =====

/// Max per-dimension CV at or below which a measurement frame is stable.
pub const MEASUREMENT_CV_THRESHOLD: f64 = 0.05;

/// Consecutive stable frames needed to lock a body measurement.
///
/// Ten seconds at 30 fps.
pub const MEASUREMENT_LOCK_FRAMES: u32 = 300;

/// Sliding window length for the measurement CV.
pub const MEASUREMENT_WINDOW_SIZE: usize = 20;

/// Samples required before measurement CV is evaluated.
///
/// A single-sample window has zero dispersion, so the first frame counts.
pub const MEASUREMENT_MIN_MEASUREMENTS: usize = 1;

/// Iteration budget for Weiszfeld's algorithm.
pub const MEDIAN_MAX_ITERATIONS: u32 = 100;

/// Displacement below which Weiszfeld's algorithm has converged.
pub const MEDIAN_TOLERANCE: f64 = 1e-6;

/// Floor applied to point distances so coincident points get finite weight.
pub const MEDIAN_DISTANCE_FLOOR: f64 = 1e-10;

// ===== WARM-UP AND SPEED GATES =====

/// Frames before a warm-up gate opens.
pub const WARMUP_FRAME_THRESHOLD: u32 = 60;

/// Rotation speed above which a scan frame is unsafe (degrees per second).
pub const SAFE_ROTATION_SPEED_DEG_PER_S: f64 = 30.0;

// ===== SNAPSHOTS =====

/// Upper bound on warnings attached to a single snapshot.
pub const MAX_SNAPSHOT_WARNINGS: usize = 4;
