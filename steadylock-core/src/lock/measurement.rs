//! Vector measurement lock
//!
//! ## Overview
//!
//! Watches a body-shape parameter stream until it has been stable for
//! `lock_frame_threshold` consecutive frames (ten seconds at 30 fps by
//! default), then commits a robust central value.
//!
//! ## Two Buffers
//!
//! ```text
//! window  (last W samples)  -> max per-dimension CV -> stable? -> streak
//! history (every sample)    -> geometric median at lock time
//! ```
//!
//! The window decides *when* to lock. The history decides *what* is
//! committed: the Weiszfeld geometric median over every accepted sample
//! since the last reset, so brief glitches during a long scan barely move
//! the result. `history_limit` optionally bounds the history, oldest first.
//!
//! ## Dimension
//!
//! The first accepted sample of a cycle fixes the vector length. Later
//! samples of a different length are rejected until `reset()`.
//!
//! ## Usage Example
//!
//! ```rust
//! use steadylock_core::lock::{MeasurementLock, MeasurementLockConfig, UMI_PREFIX};
//!
//! let config = MeasurementLockConfig::default().with_lock_frame_threshold(3);
//! let mut lock = MeasurementLock::new(config)?;
//!
//! for _ in 0..3 {
//!     lock.add_measurement(&[1.0, 2.0])?;
//! }
//!
//! assert!(lock.is_locked());
//! assert_eq!(lock.geometric_median(), Some(&[1.0, 2.0][..]));
//! assert!(lock.universal_id().unwrap().as_str().starts_with(UMI_PREFIX));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        MEASUREMENT_CV_THRESHOLD, MEASUREMENT_LOCK_FRAMES, MEASUREMENT_MIN_MEASUREMENTS, MEASUREMENT_WINDOW_SIZE,
        MEDIAN_MAX_ITERATIONS, MEDIAN_TOLERANCE,
    },
    errors::{check, validate_vector, ConfigError, ConfigResult, LockError, LockResult, ValidationError},
    lock::{id::UniversalMeasurementId, push_warning, LockState, LockWarning, StreakCounter, Warnings},
    stats::{self, MedianEstimate},
    time::{SystemClock, TimeSource},
    window::SlidingWindow,
};

/// Measurement lock parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasurementLockConfig {
    /// Max per-dimension CV at or below which a frame is stable
    pub cv_threshold: f64,
    /// Consecutive stable frames needed to lock
    pub lock_frame_threshold: u32,
    /// Sliding window length
    pub window_size: usize,
    /// Samples required before the CV is evaluated
    pub min_measurements: usize,
    /// Weiszfeld iteration budget
    pub median_max_iterations: u32,
    /// Weiszfeld convergence tolerance
    pub median_tolerance: f64,
    /// Maximum history length, `None` keeps every sample
    pub history_limit: Option<usize>,
}

impl Default for MeasurementLockConfig {
    fn default() -> Self {
        Self {
            cv_threshold: MEASUREMENT_CV_THRESHOLD,
            lock_frame_threshold: MEASUREMENT_LOCK_FRAMES,
            window_size: MEASUREMENT_WINDOW_SIZE,
            min_measurements: MEASUREMENT_MIN_MEASUREMENTS,
            median_max_iterations: MEDIAN_MAX_ITERATIONS,
            median_tolerance: MEDIAN_TOLERANCE,
            history_limit: None,
        }
    }
}

impl MeasurementLockConfig {
    /// Set CV threshold
    pub fn with_cv_threshold(mut self, cv_threshold: f64) -> Self {
        self.cv_threshold = cv_threshold;
        self
    }

    /// Set frames to lock
    pub fn with_lock_frame_threshold(mut self, frames: u32) -> Self {
        self.lock_frame_threshold = frames;
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

    /// Set Weiszfeld iteration budget and tolerance
    pub fn with_median_budget(mut self, max_iterations: u32, tolerance: f64) -> Self {
        self.median_max_iterations = max_iterations;
        self.median_tolerance = tolerance;
        self
    }

    /// Bound the history used for the committed median
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Range-check every field
    pub fn validate(&self) -> ConfigResult<()> {
        check::non_negative(self.cv_threshold, "cv_threshold")?;
        check::at_least(self.lock_frame_threshold as usize, 1, "lock_frame_threshold", "must be >= 1")?;
        check::at_least(self.window_size, 1, "window_size", "must be >= 1")?;
        check::at_least(self.min_measurements, 1, "min_measurements", "must be >= 1")?;
        if self.min_measurements > self.window_size {
            return Err(ConfigError::new("min_measurements", "must not exceed window_size"));
        }
        check::at_least(
            self.median_max_iterations as usize,
            1,
            "median_max_iterations",
            "must be >= 1",
        )?;
        check::positive(self.median_tolerance, "median_tolerance")?;
        if let Some(limit) = self.history_limit {
            check::at_least(limit, 1, "history_limit", "must be >= 1")?;
        }
        Ok(())
    }
}

/// Measurement lock state after a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSnapshot {
    /// Whether a value is committed
    pub is_locked: bool,
    /// Accepted frames since the last reset
    pub frame_count: u64,
    /// Consecutive stable frames
    pub stable_frame_count: u32,
    /// Max per-dimension CV of the window
    pub coefficient_of_variation: f64,
    /// Whether the latest frame passed the stability test
    pub is_stable: bool,
    /// min(streak / threshold, 1), 1.0 once locked
    pub stability_score: f64,
    /// Confidence in the committed value, 0.0 before lock
    pub confidence: f64,
    /// Diagnostics for the latest frame
    pub warnings: Warnings,
    /// Committed geometric median
    pub geometric_median: Option<Vec<f64>>,
    /// Identifier minted at lock time
    pub universal_measurement_id: Option<UniversalMeasurementId>,
    /// Wall-clock lock instant
    pub locked_at: Option<DateTime<Utc>>,
    /// Samples that fed the committed median
    pub measurement_count: usize,
}

/// Everything frozen at lock time
#[derive(Debug, Clone)]
struct Commit {
    median: MedianEstimate,
    id: UniversalMeasurementId,
    locked_at: DateTime<Utc>,
    confidence: f64,
}

/// Shape-vector stability lock
///
/// `C` supplies the wall-clock lock instant for the identifier.
#[derive(Debug, Clone)]
pub struct MeasurementLock<C: TimeSource = SystemClock> {
    config: MeasurementLockConfig,
    clock: C,
    dimension: Option<usize>,
    window: SlidingWindow<Vec<f64>>,
    /// Contiguous once locked
    history: VecDeque<Vec<f64>>,
    frame_count: u64,
    counter: StreakCounter,
    last_cv: f64,
    last_stable: bool,
    warnings: Warnings,
    commit: Option<Commit>,
}

impl MeasurementLock<SystemClock> {
    /// Create a lock stamped by the system clock
    pub fn new(config: MeasurementLockConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for MeasurementLock<SystemClock> {
    fn default() -> Self {
        Self::build(MeasurementLockConfig::default(), SystemClock)
    }
}

impl<C: TimeSource> MeasurementLock<C> {
    /// Create a lock stamped by `clock`
    pub fn with_clock(config: MeasurementLockConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    fn build(config: MeasurementLockConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            dimension: None,
            window: SlidingWindow::new(config.window_size),
            history: VecDeque::new(),
            frame_count: 0,
            counter: StreakCounter::new(config.lock_frame_threshold),
            last_cv: 0.0,
            last_stable: false,
            warnings: Warnings::new(),
            commit: None,
        }
    }

    /// Lock configuration
    pub fn config(&self) -> &MeasurementLockConfig {
        &self.config
    }

    /// Clock used for the lock instant
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Process one measurement vector
    pub fn add_measurement(&mut self, measurement: &[f64]) -> LockResult<MeasurementSnapshot> {
        validate_vector(measurement)?;
        if let Some(expected) = self.dimension {
            if measurement.len() != expected {
                return Err(ValidationError::DimensionMismatch {
                    expected,
                    actual: measurement.len(),
                }
                .into());
            }
        }
        if self.is_locked() {
            return Err(LockError::AlreadyLocked);
        }

        self.dimension = Some(measurement.len());
        self.frame_count += 1;
        self.push_history(measurement.to_vec());
        self.window.push(measurement.to_vec());

        let enough = self.window.len() >= self.config.min_measurements;
        let cv = if enough {
            stats::max_dimension_cv(self.window.iter().map(Vec::as_slice), measurement.len())
        } else {
            0.0
        };
        let stable = enough && cv <= self.config.cv_threshold;

        if let Some(previous) = self.counter.record(stable) {
            log::debug!(
                "Measurement streak reset after {} frames at frame {} (cv {:.4})",
                previous,
                self.frame_count,
                cv
            );
        }
        self.last_cv = cv;
        self.last_stable = stable;

        self.warnings.clear();
        if !enough {
            push_warning(
                &mut self.warnings,
                LockWarning::InsufficientMeasurements {
                    count: self.window.len(),
                    required: self.config.min_measurements,
                },
            );
        }
        if cv > 2.0 * self.config.cv_threshold {
            push_warning(
                &mut self.warnings,
                LockWarning::HighVariation {
                    frame: self.frame_count,
                    cv,
                },
            );
        }

        if self.counter.reached() {
            self.lock();
        }

        Ok(self.snapshot())
    }

    fn push_history(&mut self, sample: Vec<f64>) {
        if let Some(limit) = self.config.history_limit {
            while self.history.len() >= limit {
                self.history.pop_front();
            }
        }
        self.history.push_back(sample);
    }

    fn lock(&mut self) {
        self.history.make_contiguous();
        let estimate = stats::geometric_median(
            self.history.iter().map(Vec::as_slice),
            self.config.median_max_iterations,
            self.config.median_tolerance,
        );
        let Some(median) = estimate else {
            return;
        };

        let locked_at = self.clock.now();
        let id = UniversalMeasurementId::mint(&median.point, locked_at);
        let confidence = self.counter.progress().min(1.0);

        log::info!(
            "Measurement locked at frame {} over {} samples: {} (median {:?}, {} iterations)",
            self.frame_count,
            self.history.len(),
            id,
            median.point,
            median.iterations
        );

        self.commit = Some(Commit {
            median,
            id,
            locked_at,
            confidence,
        });
    }

    /// Current state without adding a measurement
    pub fn snapshot(&self) -> MeasurementSnapshot {
        let commit = self.commit.as_ref();
        MeasurementSnapshot {
            is_locked: commit.is_some(),
            frame_count: self.frame_count,
            stable_frame_count: self.counter.streak(),
            coefficient_of_variation: self.last_cv,
            is_stable: self.last_stable,
            stability_score: if commit.is_some() { 1.0 } else { self.counter.progress() },
            confidence: commit.map_or(0.0, |c| c.confidence),
            warnings: self.warnings.clone(),
            geometric_median: commit.map(|c| c.median.point.clone()),
            universal_measurement_id: commit.map(|c| c.id.clone()),
            locked_at: commit.map(|c| c.locked_at),
            measurement_count: if commit.is_some() { self.history.len() } else { 0 },
        }
    }

    /// Committed geometric median, once locked
    pub fn geometric_median(&self) -> Option<&[f64]> {
        self.commit.as_ref().map(|c| c.median.point.as_slice())
    }

    /// Full Weiszfeld result, once locked
    pub fn median_estimate(&self) -> Option<&MedianEstimate> {
        self.commit.as_ref().map(|c| &c.median)
    }

    /// Identifier minted at lock time
    pub fn universal_id(&self) -> Option<&UniversalMeasurementId> {
        self.commit.as_ref().map(|c| &c.id)
    }

    /// Samples the committed median was computed from
    pub fn locked_measurements(&self) -> Option<&[Vec<f64>]> {
        self.commit.as_ref().map(|_| self.history.as_slices().0)
    }

    /// `(streak, lock_frame_threshold)`
    pub fn progress(&self) -> (u32, u32) {
        (self.counter.streak(), self.counter.threshold())
    }

    /// Whether a value is committed
    pub fn is_locked(&self) -> bool {
        self.commit.is_some()
    }

    /// Position in the lock cycle
    pub fn state(&self) -> LockState {
        self.counter.state(self.is_locked())
    }

    /// Vector length fixed by the first sample of this cycle
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Samples currently held in the history
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Discard history, window, streak and commit
    pub fn reset(&mut self) {
        match &self.commit {
            Some(commit) => log::info!("Measurement lock reset, discarding {}", commit.id),
            None => log::info!("Measurement lock reset after {} frames", self.frame_count),
        }
        self.dimension = None;
        self.window.clear();
        self.history.clear();
        self.frame_count = 0;
        self.counter.reset();
        self.last_cv = 0.0;
        self.last_stable = false;
        self.warnings.clear();
        self.commit = None;
    }
}
