//! Rotation speed monitor
//!
//! Turns the smoothed derivatives of a pose filter into one angular speed.
//! Channels are axis-angle parameters in radians, so the Euclidean norm of
//! their derivatives is a rotation rate in rad/s, reported in deg/s.
//!
//! ```text
//! speed = degrees( ‖(dx̂₀, dx̂₁, ..., dx̂ₙ)‖₂ )
//! ```
//!
//! The monitor owns nothing but its last reading. Callers pass the filter
//! in when they want a fresh value; the `is_*`/`speed_warning` views read
//! the cached value only.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    constants::SAFE_ROTATION_SPEED_DEG_PER_S,
    errors::{check, ConfigResult},
    filters::AdaptiveFilter,
};

/// Speed monitor parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedMonitorConfig {
    /// Speed above which a frame is unsafe (deg/s)
    pub safe_speed_deg_per_s: f64,
}

impl Default for SpeedMonitorConfig {
    fn default() -> Self {
        Self {
            safe_speed_deg_per_s: SAFE_ROTATION_SPEED_DEG_PER_S,
        }
    }
}

impl SpeedMonitorConfig {
    /// Set the safe speed limit
    pub fn with_safe_speed(mut self, deg_per_s: f64) -> Self {
        self.safe_speed_deg_per_s = deg_per_s;
        self
    }

    /// Range-check every field
    pub fn validate(&self) -> ConfigResult<()> {
        check::positive(self.safe_speed_deg_per_s, "safe_speed_deg_per_s")
    }
}

/// Speed limit exceeded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedWarning {
    /// Measured speed (deg/s)
    pub speed: f64,
    /// Limit that was exceeded (deg/s)
    pub threshold: f64,
}

impl fmt::Display for SpeedWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rotation speed ({:.1} deg/s) exceeds safe limit ({:.1} deg/s). Please slow down.",
            self.speed, self.threshold
        )
    }
}

/// Angular speed derived from a pose filter
#[derive(Debug, Clone, Default)]
pub struct RotationSpeedMonitor {
    config: SpeedMonitorConfig,
    last_speed: f64,
}

impl RotationSpeedMonitor {
    /// Create a monitor with a validated limit
    pub fn new(config: SpeedMonitorConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            last_speed: 0.0,
        })
    }

    /// Configured safe speed (deg/s)
    pub fn safe_speed(&self) -> f64 {
        self.config.safe_speed_deg_per_s
    }

    /// Recompute the speed from `filter` and cache it
    ///
    /// A filter with no seeded channels reads 0.
    pub fn get_rotation_speed(&mut self, filter: &AdaptiveFilter) -> f64 {
        let rad_per_s = filter
            .channel_states()
            .map(|(_, state)| state.derivative * state.derivative)
            .sum::<f64>()
            .sqrt();
        self.last_speed = rad_per_s.to_degrees();
        self.last_speed
    }

    /// Last computed speed (deg/s)
    pub fn last_speed(&self) -> f64 {
        self.last_speed
    }

    /// Cached speed is at or below `threshold`
    pub fn is_speed_safe(&self, threshold: f64) -> bool {
        self.last_speed <= threshold
    }

    /// Warning if the cached speed exceeds `threshold`
    pub fn speed_warning(&self, threshold: f64) -> Option<SpeedWarning> {
        (self.last_speed > threshold).then_some(SpeedWarning {
            speed: self.last_speed,
            threshold,
        })
    }

    /// Cached speed is within the configured limit
    pub fn is_within_limit(&self) -> bool {
        self.is_speed_safe(self.config.safe_speed_deg_per_s)
    }

    /// Recompute, then check against `threshold`
    pub fn check_speed_safe(&mut self, filter: &AdaptiveFilter, threshold: f64) -> bool {
        self.get_rotation_speed(filter);
        self.is_speed_safe(threshold)
    }

    /// Recompute, then warn if above `threshold`
    pub fn check_speed_warning(&mut self, filter: &AdaptiveFilter, threshold: f64) -> Option<SpeedWarning> {
        self.get_rotation_speed(filter);
        let warning = self.speed_warning(threshold);
        if let Some(w) = &warning {
            log::debug!("{}", w);
        }
        warning
    }

    /// Forget the cached speed
    pub fn reset(&mut self) {
        self.last_speed = 0.0;
    }
}
