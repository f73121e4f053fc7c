//! Scalar calibration lock
//!
//! Freezes the camera scale factor once it has held steady. The stability
//! metric is the coefficient of variation over the last `window_size`
//! samples; after `stable_frame_threshold` consecutive stable frames the
//! window mean is committed.
//!
//! ## Stability Score
//!
//! A UI-facing value in [0, 1]:
//!
//! ```text
//! score = 0.70 · max(0, (threshold - cv) / threshold)
//!       + 0.15 · [frame is stable]
//!       + 0.15 · min(streak / stable_frame_threshold, 1)
//! score = 1.0 once locked
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        CALIBRATION_CV_THRESHOLD, CALIBRATION_MIN_MEASUREMENTS, CALIBRATION_STABLE_FRAMES, CALIBRATION_WINDOW_SIZE,
    },
    errors::{check, ConfigResult, LockError, LockResult, ValidationError},
    lock::{push_warning, LockState, LockWarning, StreakCounter, Warnings},
    stats,
    window::SlidingWindow,
};

const CV_WEIGHT: f64 = 0.7;
const STABLE_BONUS: f64 = 0.15;
const PROGRESS_WEIGHT: f64 = 0.15;

/// Streaks shorter than this are flagged as early
const EARLY_STREAK: u32 = 5;

/// Calibration lock parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationLockConfig {
    /// CV at or below which a frame is stable
    pub cv_threshold: f64,
    /// Consecutive stable frames needed to lock
    pub stable_frame_threshold: u32,
    /// Sliding window length
    pub window_size: usize,
    /// Samples required before the CV is evaluated
    pub min_measurements: usize,
}

impl Default for CalibrationLockConfig {
    fn default() -> Self {
        Self {
            cv_threshold: CALIBRATION_CV_THRESHOLD,
            stable_frame_threshold: CALIBRATION_STABLE_FRAMES,
            window_size: CALIBRATION_WINDOW_SIZE,
            min_measurements: CALIBRATION_MIN_MEASUREMENTS,
        }
    }
}

impl CalibrationLockConfig {
    /// Set CV threshold
    pub fn with_cv_threshold(mut self, cv_threshold: f64) -> Self {
        self.cv_threshold = cv_threshold;
        self
    }

    /// Set frames to lock
    pub fn with_stable_frame_threshold(mut self, frames: u32) -> Self {
        self.stable_frame_threshold = frames;
        self
    }

    /// Set window length
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Set minimum samples before evaluation
    pub fn with_min_measurements(mut self, min_measurements: usize) -> Self {
        self.min_measurements = min_measurements;
        self
    }

    /// Range-check every field
    pub fn validate(&self) -> ConfigResult<()> {
        check::non_negative(self.cv_threshold, "cv_threshold")?;
        check::at_least(
            self.stable_frame_threshold as usize,
            1,
            "stable_frame_threshold",
            "must be >= 1",
        )?;
        check::at_least(self.window_size, 2, "window_size", "must be >= 2")?;
        check::at_least(self.min_measurements, 2, "min_measurements", "must be >= 2")
    }
}

/// Calibration state after a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilitySnapshot {
    /// CV of the window, 0.0 while too few samples exist
    pub coefficient_of_variation: f64,
    /// UI feedback score in [0, 1]
    pub stability_score: f64,
    /// Whether the latest frame passed the stability test
    pub is_stable: bool,
    /// Whether the scale is committed
    pub is_locked: bool,
    /// Consecutive stable frames
    pub stable_frame_count: u32,
    /// Samples in the window
    pub measurements_count: usize,
    /// Diagnostics for the latest frame
    pub warnings: Warnings,
}

/// Scale-factor stability lock
#[derive(Debug, Clone)]
pub struct CalibrationLock {
    config: CalibrationLockConfig,
    window: SlidingWindow<f64>,
    counter: StreakCounter,
    locked_scale: Option<f64>,
    warnings: Warnings,
}

impl Default for CalibrationLock {
    fn default() -> Self {
        Self::build(CalibrationLockConfig::default())
    }
}

impl CalibrationLock {
    /// Create a lock after validating its configuration
    pub fn new(config: CalibrationLockConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: CalibrationLockConfig) -> Self {
        Self {
            config,
            window: SlidingWindow::new(config.window_size),
            counter: StreakCounter::new(config.stable_frame_threshold),
            locked_scale: None,
            warnings: Warnings::new(),
        }
    }

    /// Lock configuration
    pub fn config(&self) -> &CalibrationLockConfig {
        &self.config
    }

    /// Process one scale factor
    ///
    /// The value must be finite and strictly positive. A locked instance
    /// rejects every measurement until `reset()`.
    pub fn add_measurement(&mut self, scale: f64) -> LockResult<StabilitySnapshot> {
        if !scale.is_finite() {
            return Err(ValidationError::NotFinite.into());
        }
        if scale <= 0.0 {
            return Err(ValidationError::NotPositive { value: scale }.into());
        }
        if self.is_locked() {
            return Err(LockError::AlreadyLocked);
        }

        self.window.push(scale);
        let cv = self.current_cv();
        let stable = self.frame_is_stable(cv);

        let broken = self.counter.record(stable);
        if let Some(previous) = broken {
            log::debug!(
                "Calibration streak reset after {} frames (cv {:.4} > {:.4})",
                previous,
                cv,
                self.config.cv_threshold
            );
        }

        if self.counter.reached() {
            let scale = stats::mean(&self.window.to_vec());
            self.locked_scale = Some(scale);
            log::info!(
                "Calibration locked at scale {:.6} after {} stable frames",
                scale,
                self.counter.streak()
            );
        }

        self.warnings = self.frame_warnings(cv, stable, broken);
        Ok(self.build_snapshot(cv, stable))
    }

    /// Current state without adding a measurement
    ///
    /// The metric is recomputed over the current window; warnings are those
    /// of the last accepted frame.
    pub fn snapshot(&self) -> StabilitySnapshot {
        let cv = self.current_cv();
        self.build_snapshot(cv, self.frame_is_stable(cv))
    }

    /// Committed scale factor, once locked
    pub fn locked_scale(&self) -> Option<f64> {
        self.locked_scale
    }

    /// Whether the scale is committed
    pub fn is_locked(&self) -> bool {
        self.locked_scale.is_some()
    }

    /// Position in the lock cycle
    pub fn state(&self) -> LockState {
        self.counter.state(self.is_locked())
    }

    /// `(streak, stable_frame_threshold)`
    pub fn progress(&self) -> (u32, u32) {
        (self.counter.streak(), self.counter.threshold())
    }

    /// Clear window, streak and committed value
    pub fn reset(&mut self) {
        if let Some(scale) = self.locked_scale {
            log::info!("Calibration reset, discarding locked scale {:.6}", scale);
        } else {
            log::info!("Calibration reset");
        }
        self.window.clear();
        self.counter.reset();
        self.locked_scale = None;
        self.warnings.clear();
    }

    fn has_enough_samples(&self) -> bool {
        self.window.len() >= self.config.min_measurements
    }

    fn current_cv(&self) -> f64 {
        if !self.has_enough_samples() {
            return 0.0;
        }
        stats::coefficient_of_variation(&self.window.to_vec())
    }

    fn frame_is_stable(&self, cv: f64) -> bool {
        self.has_enough_samples() && cv <= self.config.cv_threshold
    }

    fn stability_score(&self, cv: f64, stable: bool) -> f64 {
        if self.is_locked() {
            return 1.0;
        }

        let threshold = self.config.cv_threshold;
        let proximity = if threshold > 0.0 {
            ((threshold - cv) / threshold).max(0.0)
        } else if cv <= 0.0 {
            1.0
        } else {
            0.0
        };

        let bonus = if stable { STABLE_BONUS } else { 0.0 };
        let score = CV_WEIGHT * proximity + bonus + PROGRESS_WEIGHT * self.counter.progress();
        score.clamp(0.0, 1.0)
    }

    fn frame_warnings(&self, cv: f64, stable: bool, broken: Option<u32>) -> Warnings {
        let mut warnings = Warnings::new();

        if !self.has_enough_samples() {
            push_warning(
                &mut warnings,
                LockWarning::InsufficientMeasurements {
                    count: self.window.len(),
                    required: self.config.min_measurements,
                },
            );
        } else if !stable {
            push_warning(
                &mut warnings,
                LockWarning::UnstableFrame {
                    cv,
                    threshold: self.config.cv_threshold,
                },
            );
            if let Some(previous) = broken {
                push_warning(&mut warnings, LockWarning::CounterReset { previous });
            }
        }

        let streak = self.counter.streak();
        if streak > 0 && streak < EARLY_STREAK && !self.is_locked() {
            push_warning(
                &mut warnings,
                LockWarning::EarlyStability {
                    streak,
                    threshold: self.counter.threshold(),
                },
            );
        }

        warnings
    }

    fn build_snapshot(&self, cv: f64, stable: bool) -> StabilitySnapshot {
        StabilitySnapshot {
            coefficient_of_variation: cv,
            stability_score: self.stability_score(cv, stable),
            is_stable: stable,
            is_locked: self.is_locked(),
            stable_frame_count: self.counter.streak(),
            measurements_count: self.window.len(),
            warnings: self.warnings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_lock() -> CalibrationLock {
        CalibrationLock::new(
            CalibrationLockConfig::default()
                .with_cv_threshold(0.2)
                .with_stable_frame_threshold(2)
                .with_min_measurements(2)
                .with_window_size(2),
        )
        .unwrap()
    }

    #[test]
    fn locks_on_constant_scale() {
        let mut lock = small_lock();

        let first = lock.add_measurement(100.0).unwrap();
        assert!(!first.is_stable);
        assert_eq!(first.coefficient_of_variation, 0.0);

        let second = lock.add_measurement(100.0).unwrap();
        assert!(second.is_stable);
        assert!(!second.is_locked);
        assert_eq!(lock.state(), LockState::StableProgressing);

        let third = lock.add_measurement(100.0).unwrap();
        assert!(third.is_locked);
        assert_eq!(third.stability_score, 1.0);
        assert_eq!(lock.locked_scale(), Some(100.0));
        assert_eq!(lock.state(), LockState::Locked);
    }

    #[test]
    fn default_lock_needs_thirty_stable_frames() {
        let mut lock = CalibrationLock::default();
        let mut locked_at = None;
        for frame in 1..=40 {
            let snapshot = lock.add_measurement(0.54).unwrap();
            if snapshot.is_locked {
                locked_at = Some(frame);
                break;
            }
        }
        // first frame has too few samples, then 30 stable frames
        assert_eq!(locked_at, Some(31));
        assert!((lock.locked_scale().unwrap() - 0.54).abs() < 1e-12);
    }

    #[test]
    fn locked_scale_is_window_mean() {
        let mut lock = CalibrationLock::new(
            CalibrationLockConfig::default()
                .with_cv_threshold(0.5)
                .with_stable_frame_threshold(1)
                .with_window_size(2),
        )
        .unwrap();
        lock.add_measurement(1.0).unwrap();
        let snapshot = lock.add_measurement(2.0).unwrap();
        assert!(snapshot.is_locked);
        assert_eq!(lock.locked_scale(), Some(1.5));
    }

    #[test]
    fn huge_scales_lock_to_finite_value() {
        let mut lock = CalibrationLock::new(
            CalibrationLockConfig::default()
                .with_stable_frame_threshold(2)
                .with_window_size(2),
        )
        .unwrap();
        for _ in 0..3 {
            lock.add_measurement(1e308).unwrap();
        }
        assert!(lock.is_locked());
        let scale = lock.locked_scale().unwrap();
        assert!(scale.is_finite());
        assert!((scale - 1e308).abs() < 1e294);
    }

    #[test]
    fn validation_errors() {
        let mut lock = CalibrationLock::default();
        assert_eq!(
            lock.add_measurement(f64::NAN).unwrap_err(),
            LockError::Invalid(ValidationError::NotFinite)
        );
        assert_eq!(
            lock.add_measurement(f64::INFINITY).unwrap_err(),
            LockError::Invalid(ValidationError::NotFinite)
        );
        assert_eq!(
            lock.add_measurement(-1.0).unwrap_err(),
            LockError::Invalid(ValidationError::NotPositive { value: -1.0 })
        );
        assert_eq!(
            lock.add_measurement(0.0).unwrap_err(),
            LockError::Invalid(ValidationError::NotPositive { value: 0.0 })
        );
        assert_eq!(lock.snapshot().measurements_count, 0);
    }

    #[test]
    fn locked_rejects_and_preserves_state() {
        let mut lock = small_lock();
        for _ in 0..3 {
            lock.add_measurement(100.0).unwrap();
        }
        let before = lock.snapshot();

        assert_eq!(lock.add_measurement(100.0).unwrap_err(), LockError::AlreadyLocked);
        assert_eq!(lock.snapshot(), before);

        // validation still wins over the lock check
        assert_eq!(
            lock.add_measurement(-5.0).unwrap_err(),
            LockError::Invalid(ValidationError::NotPositive { value: -5.0 })
        );
    }

    #[test]
    fn unstable_frame_resets_streak() {
        let mut lock = CalibrationLock::new(
            CalibrationLockConfig::default()
                .with_stable_frame_threshold(10)
                .with_window_size(2),
        )
        .unwrap();
        for _ in 0..5 {
            lock.add_measurement(1.0).unwrap();
        }
        assert_eq!(lock.progress(), (4, 10));

        let snapshot = lock.add_measurement(3.0).unwrap();
        assert!(!snapshot.is_stable);
        assert_eq!(snapshot.stable_frame_count, 0);
        assert_eq!(lock.state(), LockState::Accumulating);
        assert!(snapshot.warnings.contains(&LockWarning::CounterReset { previous: 4 }));
        assert!(matches!(snapshot.warnings[0], LockWarning::UnstableFrame { .. }));
    }

    #[test]
    fn early_warning_only_for_short_streaks() {
        let mut lock = CalibrationLock::default();
        lock.add_measurement(1.0).unwrap();
        let snapshot = lock.add_measurement(1.0).unwrap();
        assert!(snapshot
            .warnings
            .contains(&LockWarning::EarlyStability { streak: 1, threshold: 30 }));

        for _ in 0..5 {
            lock.add_measurement(1.0).unwrap();
        }
        assert!(lock.snapshot().warnings.is_empty());
    }

    #[test]
    fn insufficient_measurements_warning() {
        let mut lock = CalibrationLock::default();
        let snapshot = lock.add_measurement(1.0).unwrap();
        assert_eq!(
            snapshot.warnings.as_slice(),
            &[LockWarning::InsufficientMeasurements { count: 1, required: 2 }]
        );
    }

    #[test]
    fn score_components() {
        let mut lock = CalibrationLock::default();
        // too few samples: cv 0 -> full proximity, no bonus, no progress
        let first = lock.add_measurement(1.0).unwrap();
        assert!((first.stability_score - 0.7).abs() < 1e-12);

        // stable with streak 1/30
        let second = lock.add_measurement(1.0).unwrap();
        let expected = 0.7 + 0.15 + 0.15 / 30.0;
        assert!((second.stability_score - expected).abs() < 1e-12);

        // far above threshold: nothing
        let third = lock.add_measurement(10.0).unwrap();
        assert_eq!(third.stability_score, 0.0);
    }

    #[test]
    fn reset_starts_fresh_cycle() {
        let mut lock = small_lock();
        for _ in 0..3 {
            lock.add_measurement(100.0).unwrap();
        }
        lock.reset();
        assert!(!lock.is_locked());
        assert_eq!(lock.locked_scale(), None);
        assert_eq!(lock.snapshot().measurements_count, 0);
        assert!(lock.add_measurement(50.0).is_ok());
    }

    #[test]
    fn config_validation() {
        assert!(CalibrationLock::new(CalibrationLockConfig::default().with_window_size(1)).is_err());
        assert!(CalibrationLock::new(CalibrationLockConfig::default().with_min_measurements(1)).is_err());
        assert!(CalibrationLock::new(CalibrationLockConfig::default().with_stable_frame_threshold(0)).is_err());
        assert!(CalibrationLock::new(CalibrationLockConfig::default().with_cv_threshold(-0.1)).is_err());
    }
}
