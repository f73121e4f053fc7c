//! Frame-count warm-up gate
//!
//! Opens once a stream has delivered enough frames, regardless of their
//! values. Used to hold back shape estimates while the upstream model is
//! still settling after a scan starts.
//!
//! ```text
//! progress = min(frame_count / threshold, 1.0)     (threshold 0 -> 1.0)
//! is_stable = frame_count >= threshold              (stays true until reset)
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    constants::WARMUP_FRAME_THRESHOLD,
    errors::{validate_vector, LockResult},
};

/// Warm-up gate parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    /// Frames before the gate opens; zero opens it on the first frame
    pub frame_threshold: u32,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            frame_threshold: WARMUP_FRAME_THRESHOLD,
        }
    }
}

impl WarmupConfig {
    /// Set the frame threshold
    pub fn with_frame_threshold(mut self, frame_threshold: u32) -> Self {
        self.frame_threshold = frame_threshold;
        self
    }
}

/// Gate state after a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarmupSnapshot {
    /// Frames seen since the last reset
    pub frame_count: u32,
    /// Whether the gate is open
    pub is_stable: bool,
    /// Fraction of the warm-up completed, in [0, 1]
    pub progress: f64,
    /// Frames still needed before the gate opens
    pub frames_remaining: u32,
}

/// Frame-count readiness gate
#[derive(Debug, Clone, Default)]
pub struct WarmupGate {
    config: WarmupConfig,
    frame_count: u32,
}

impl WarmupGate {
    /// Create a closed gate
    ///
    /// Every threshold is accepted; zero opens on the first frame.
    pub fn new(config: WarmupConfig) -> Self {
        Self { config, frame_count: 0 }
    }

    /// Gate configuration
    pub fn config(&self) -> &WarmupConfig {
        &self.config
    }

    /// Count one frame
    ///
    /// The vector is validated (non-empty, finite) but otherwise ignored.
    pub fn update(&mut self, measurement: &[f64]) -> LockResult<WarmupSnapshot> {
        validate_vector(measurement)?;

        let was_stable = self.is_stable();
        self.frame_count = self.frame_count.saturating_add(1);
        if !was_stable && self.is_stable() {
            log::info!("Warm-up complete after {} frames", self.frame_count);
        }

        Ok(self.snapshot())
    }

    /// Current gate state
    pub fn snapshot(&self) -> WarmupSnapshot {
        WarmupSnapshot {
            frame_count: self.frame_count,
            is_stable: self.is_stable(),
            progress: self.progress_fraction(),
            frames_remaining: self.config.frame_threshold.saturating_sub(self.frame_count),
        }
    }

    /// `(frame_count, threshold)`
    pub fn progress(&self) -> (u32, u32) {
        (self.frame_count, self.config.frame_threshold)
    }

    /// Whether the warm-up period is complete
    ///
    /// A zero threshold is open only once a frame has been counted.
    pub fn is_stable(&self) -> bool {
        self.frame_count > 0 && self.frame_count >= self.config.frame_threshold
    }

    fn progress_fraction(&self) -> f64 {
        if self.config.frame_threshold == 0 {
            return if self.frame_count > 0 { 1.0 } else { 0.0 };
        }
        (self.frame_count as f64 / self.config.frame_threshold as f64).min(1.0)
    }

    /// Close the gate and zero the counter
    pub fn reset(&mut self) {
        if self.frame_count > 0 {
            log::info!("Warm-up reset after {} frames", self.frame_count);
        }
        self.frame_count = 0;
    }
}
