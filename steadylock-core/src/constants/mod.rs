//! Constants for Steadylock Core
//!
//! Centralized defaults for every filter and lock. Config structs take their
//! `Default` values from here, so a tuning change happens in one place.
//!
//! ## Organization
//!
//! - **Filters**: smoothing parameters for the adaptive and linear filters
//! - **Locks**: stability thresholds, window sizes and robust-estimation budgets
//!
//! ## Usage Guidelines
//!
//! 1. Use these constants instead of magic numbers
//! 2. Include units in names where the value has one

/// Smoothing filter parameters.
pub mod filters;

/// Stability lock, warm-up and speed-gate parameters.
pub mod locks;

pub use filters::{
    ONE_EURO_FREQUENCY_HZ, ONE_EURO_MIN_CUTOFF_HZ, ONE_EURO_BETA, ONE_EURO_DERIVATIVE_CUTOFF_HZ,
    KALMAN_PROCESS_NOISE, KALMAN_MEASUREMENT_NOISE, KALMAN_INITIAL_UNCERTAINTY,
    SHAPE_DIMENSION, POSE_JOINT_COUNT,
};

pub use locks::{
    CALIBRATION_CV_THRESHOLD, CALIBRATION_STABLE_FRAMES, CALIBRATION_WINDOW_SIZE,
    CALIBRATION_MIN_MEASUREMENTS,
    MEASUREMENT_CV_THRESHOLD, MEASUREMENT_LOCK_FRAMES, MEASUREMENT_WINDOW_SIZE,
    MEASUREMENT_MIN_MEASUREMENTS, MEDIAN_MAX_ITERATIONS, MEDIAN_TOLERANCE, MEDIAN_DISTANCE_FLOOR,
    WARMUP_FRAME_THRESHOLD, SAFE_ROTATION_SPEED_DEG_PER_S, MAX_SNAPSHOT_WARNINGS,
};
