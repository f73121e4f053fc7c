//! Stability Locks
//!
//! ## Overview
//!
//! A lock watches a measurement stream and decides when it has settled
//! enough to commit a single value. Two variants share one state machine:
//!
//! - [`CalibrationLock`]: scalar scale factor, commits the window mean
//! - [`MeasurementLock`]: shape vector, commits the geometric median of the
//!   whole history and mints a [`UniversalMeasurementId`]
//!
//! ## State Machine
//!
//! ```text
//!                 stable frame                   streak == threshold
//! Accumulating ----------------> StableProgressing ------------------> Locked
//!      ^                              |                                  |
//!      +------- unstable frame -------+                                  |
//!      +------------------------------ reset() --------------------------+
//! ```
//!
//! A frame is stable when the window holds at least `min_measurements`
//! samples and its coefficient of variation is at or below the threshold.
//! Any other frame zeroes the streak. `Locked` rejects further measurements
//! with [`LockError::AlreadyLocked`](crate::errors::LockError::AlreadyLocked).

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_SNAPSHOT_WARNINGS;

/// Scalar calibration lock.
pub mod calibration;

/// Universal measurement identifiers.
pub mod id;

/// Vector measurement lock.
pub mod measurement;

pub use calibration::{CalibrationLock, CalibrationLockConfig, StabilitySnapshot};
pub use id::{UniversalMeasurementId, UMI_PREFIX};
pub use measurement::{MeasurementLock, MeasurementLockConfig, MeasurementSnapshot};

/// Where a lock is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockState {
    /// No stable streak yet
    Accumulating,
    /// At least one consecutive stable frame, not yet locked
    StableProgressing,
    /// Committed; only `reset()` leaves this state
    Locked,
}

/// Diagnostic attached to a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LockWarning {
    /// Window too small to evaluate
    InsufficientMeasurements {
        /// Samples in the window
        count: usize,
        /// Samples needed
        required: usize,
    },
    /// Frame failed the stability test
    UnstableFrame {
        /// Window coefficient of variation
        cv: f64,
        /// Configured threshold
        threshold: f64,
    },
    /// A stable streak was broken by this frame
    CounterReset {
        /// Streak length before the reset
        previous: u32,
    },
    /// Streak has only just started
    EarlyStability {
        /// Current streak
        streak: u32,
        /// Frames needed to lock
        threshold: u32,
    },
    /// Variation well above threshold
    HighVariation {
        /// Frame number since reset
        frame: u64,
        /// Window coefficient of variation
        cv: f64,
    },
}

impl fmt::Display for LockWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientMeasurements { count, required } => {
                write!(f, "Insufficient measurements ({}/{}) for stability evaluation", count, required)
            }
            Self::UnstableFrame { cv, threshold } => {
                write!(f, "Unstable frame: CV={:.4} exceeds threshold={:.4}", cv, threshold)
            }
            Self::CounterReset { previous } => write!(f, "Stability counter reset (was {})", previous),
            Self::EarlyStability { streak, threshold } => {
                write!(f, "Early in stability phase ({}/{} frames)", streak, threshold)
            }
            Self::HighVariation { frame, cv } => write!(f, "High variation in frame {}: CV={:.4}", frame, cv),
        }
    }
}

/// Warnings carried by one snapshot
pub type Warnings = heapless::Vec<LockWarning, MAX_SNAPSHOT_WARNINGS>;

/// Append a warning, dropping it if the snapshot is full
pub(crate) fn push_warning(warnings: &mut Warnings, warning: LockWarning) {
    if warnings.push(warning).is_err() {
        log::debug!("Snapshot warning list full, dropped: {}", warning);
    }
}

/// Consecutive-stable-frame counter shared by both lock variants
#[derive(Debug, Clone, Copy)]
pub(crate) struct StreakCounter {
    streak: u32,
    threshold: u32,
}

impl StreakCounter {
    pub(crate) fn new(threshold: u32) -> Self {
        Self { streak: 0, threshold }
    }

    /// Count a frame; returns the broken streak length when a streak ends
    pub(crate) fn record(&mut self, stable: bool) -> Option<u32> {
        if stable {
            self.streak = self.streak.saturating_add(1);
            None
        } else {
            let previous = core::mem::replace(&mut self.streak, 0);
            (previous > 0).then_some(previous)
        }
    }

    pub(crate) fn streak(&self) -> u32 {
        self.streak
    }

    pub(crate) fn threshold(&self) -> u32 {
        self.threshold
    }

    pub(crate) fn reached(&self) -> bool {
        self.streak >= self.threshold
    }

    /// min(streak / threshold, 1)
    pub(crate) fn progress(&self) -> f64 {
        if self.threshold == 0 {
            return 1.0;
        }
        (self.streak as f64 / self.threshold as f64).min(1.0)
    }

    pub(crate) fn state(&self, locked: bool) -> LockState {
        if locked {
            LockState::Locked
        } else if self.streak > 0 {
            LockState::StableProgressing
        } else {
            LockState::Accumulating
        }
    }

    pub(crate) fn reset(&mut self) {
        self.streak = 0;
    }
}
