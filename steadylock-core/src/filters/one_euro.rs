//! Speed-Adaptive Exponential Smoothing (One Euro Filter)
//!
//! ## Overview
//!
//! A low-lag smoother for noisy per-frame channels. At rest it smooths
//! heavily; when the signal moves fast the cutoff rises so the output keeps
//! up. Reference: Casiez et al., "1€ Filter: A Simple Speed-based Low-pass
//! Filter for Noisy Input in Interactive Systems", CHI 2012.
//!
//! ## Algorithm
//!
//! Per channel, on each frame with elapsed time Δt:
//!
//! ```text
//! α(fc)   = r / (1 + r),  r = 2π·fc·Δt
//! dx      = (x - x̂ₖ₋₁) / Δt
//! dx̂ₖ     = α(d_cutoff)·dx + (1 - α(d_cutoff))·dx̂ₖ₋₁
//! fc      = min_cutoff + beta·|dx̂ₖ|
//! x̂ₖ      = α(fc)·x + (1 - α(fc))·x̂ₖ₋₁
//! ```
//!
//! The first observation on a channel seeds `x̂ = x`, `dx̂ = 0` and is returned
//! unchanged. A frame whose timestamp is not after the channel's last update
//! returns the prior estimate and leaves state untouched.
//!
//! ## Channels
//!
//! A filter instance smooths any number of independent channels, keyed by
//! index. Channel state is created lazily and dropped entirely by `reset()`.
//! The smoothed derivative of each channel stays readable, which is what the
//! rotation speed monitor consumes.
//!
//! ## Usage Example
//!
//! ```rust
//! use steadylock_core::filters::{AdaptiveFilter, OneEuroConfig};
//!
//! let mut filter = AdaptiveFilter::new(OneEuroConfig::default())?;
//!
//! // First frame passes straight through
//! assert_eq!(filter.filter(&[0.10, -0.20, 0.05], 0)?, vec![0.10, -0.20, 0.05]);
//!
//! // Later frames are smoothed
//! let smoothed = filter.filter(&[0.12, -0.21, 0.05], 33)?;
//! assert!(smoothed[0] > 0.10 && smoothed[0] < 0.12);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::btree_map::{BTreeMap, Entry};
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        ONE_EURO_BETA, ONE_EURO_DERIVATIVE_CUTOFF_HZ, ONE_EURO_FREQUENCY_HZ, ONE_EURO_MIN_CUTOFF_HZ,
        POSE_JOINT_COUNT,
    },
    errors::{check, ConfigResult, FilterResult, ValidationError},
    time::{elapsed_seconds, Timestamp},
};

/// One Euro filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OneEuroConfig {
    /// Nominal sampling frequency (Hz); Δt always comes from timestamps
    pub frequency: f64,
    /// Cutoff at zero speed (Hz)
    pub min_cutoff: f64,
    /// Cutoff gain per unit of smoothed speed
    pub beta: f64,
    /// Cutoff for the derivative low-pass (Hz)
    pub derivative_cutoff: f64,
}

impl Default for OneEuroConfig {
    fn default() -> Self {
        Self {
            frequency: ONE_EURO_FREQUENCY_HZ,
            min_cutoff: ONE_EURO_MIN_CUTOFF_HZ,
            beta: ONE_EURO_BETA,
            derivative_cutoff: ONE_EURO_DERIVATIVE_CUTOFF_HZ,
        }
    }
}

impl OneEuroConfig {
    /// Set minimum cutoff (lower = smoother at rest)
    pub fn with_min_cutoff(mut self, min_cutoff: f64) -> Self {
        self.min_cutoff = min_cutoff;
        self
    }

    /// Set speed coefficient (higher = less lag in fast motion)
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Set derivative cutoff
    pub fn with_derivative_cutoff(mut self, derivative_cutoff: f64) -> Self {
        self.derivative_cutoff = derivative_cutoff;
        self
    }

    /// Set nominal frequency
    pub fn with_frequency(mut self, frequency: f64) -> Self {
        self.frequency = frequency;
        self
    }

    /// Range-check every field
    pub fn validate(&self) -> ConfigResult<()> {
        check::positive(self.frequency, "frequency")?;
        check::positive(self.min_cutoff, "min_cutoff")?;
        check::non_negative(self.beta, "beta")?;
        check::positive(self.derivative_cutoff, "derivative_cutoff")
    }
}

/// Per-channel filter state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelState {
    /// Smoothed value
    pub value: f64,
    /// Smoothed derivative (units per second)
    pub derivative: f64,
    /// Timestamp of the last accepted update
    pub last_update: Timestamp,
}

/// Multi-channel One Euro filter
#[derive(Debug, Clone)]
pub struct AdaptiveFilter {
    config: OneEuroConfig,
    channels: BTreeMap<usize, ChannelState>,
}

impl AdaptiveFilter {
    /// Create a filter after validating its configuration
    pub fn new(config: OneEuroConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            channels: BTreeMap::new(),
        })
    }

    /// Filter configuration
    pub fn config(&self) -> &OneEuroConfig {
        &self.config
    }

    /// Smooth one channel
    ///
    /// Non-finite input is rejected without touching state.
    pub fn filter_channel(&mut self, channel: usize, value: f64, timestamp: Timestamp) -> FilterResult<f64> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite.into());
        }
        Ok(self.step(channel, value, timestamp))
    }

    /// Smooth a frame where element `i` feeds channel `i`
    ///
    /// The whole frame is validated before any channel is updated.
    pub fn filter(&mut self, values: &[f64], timestamp: Timestamp) -> FilterResult<Vec<f64>> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::NotFinite.into());
        }
        Ok(values
            .iter()
            .enumerate()
            .map(|(channel, &value)| self.step(channel, value, timestamp))
            .collect())
    }

    fn step(&mut self, channel: usize, value: f64, timestamp: Timestamp) -> f64 {
        let config = self.config;
        let state = match self.channels.entry(channel) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                slot.insert(ChannelState {
                    value,
                    derivative: 0.0,
                    last_update: timestamp,
                });
                return value;
            }
        };

        let dt = match elapsed_seconds(state.last_update, timestamp) {
            Some(dt) => dt,
            None => {
                log::debug!(
                    "Channel {} skipped stale frame at {} (last update {})",
                    channel,
                    timestamp,
                    state.last_update
                );
                return state.value;
            }
        };

        let raw_derivative = (value - state.value) / dt;
        let alpha_d = smoothing_factor(config.derivative_cutoff, dt);
        state.derivative = exponential_smooth(alpha_d, raw_derivative, state.derivative);

        let cutoff = config.min_cutoff + config.beta * state.derivative.abs();
        let alpha = smoothing_factor(cutoff, dt);
        state.value = exponential_smooth(alpha, value, state.value);
        state.last_update = timestamp;

        state.value
    }

    /// Drop all channel state
    pub fn reset(&mut self) {
        self.channels.clear();
    }

    /// Whether any channel has been seeded
    pub fn is_initialized(&self) -> bool {
        !self.channels.is_empty()
    }

    /// Number of seeded channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// State of one channel, if seeded
    pub fn channel_state(&self, channel: usize) -> Option<&ChannelState> {
        self.channels.get(&channel)
    }

    /// All seeded channels in index order
    pub fn channel_states(&self) -> impl Iterator<Item = (usize, &ChannelState)> + '_ {
        self.channels.iter().map(|(&channel, state)| (channel, state))
    }
}

/// α = r / (1 + r) with r = 2π·cutoff·Δt
fn smoothing_factor(cutoff: f64, dt: f64) -> f64 {
    let r = 2.0 * PI * cutoff * dt;
    r / (1.0 + r)
}

fn exponential_smooth(alpha: f64, value: f64, estimate: f64) -> f64 {
    alpha * value + (1.0 - alpha) * estimate
}

/// Full-body pose smoother
///
/// Wraps one `AdaptiveFilter` whose channels are the flattened axis-angle
/// parameters of every joint (joint `j`, axis `a` is channel `3j + a`).
#[derive(Debug, Clone)]
pub struct PoseFilter {
    joints: usize,
    filter: AdaptiveFilter,
}

impl PoseFilter {
    /// Axis-angle parameters per joint
    pub const AXES_PER_JOINT: usize = 3;

    /// Create a pose filter for `joints` joints
    pub fn new(config: OneEuroConfig, joints: usize) -> ConfigResult<Self> {
        check::at_least(joints, 1, "joints", "must be >= 1")?;
        Ok(Self {
            joints,
            filter: AdaptiveFilter::new(config)?,
        })
    }

    /// Pose filter for the standard 24-joint body model
    pub fn body(config: OneEuroConfig) -> ConfigResult<Self> {
        Self::new(config, POSE_JOINT_COUNT)
    }

    /// Number of joints
    pub fn joints(&self) -> usize {
        self.joints
    }

    /// Smooth a flattened pose of `joints × 3` values
    pub fn filter(&mut self, pose: &[f64], timestamp: Timestamp) -> FilterResult<Vec<f64>> {
        let expected = self.joints * Self::AXES_PER_JOINT;
        if pose.len() != expected {
            return Err(ValidationError::DimensionMismatch {
                expected,
                actual: pose.len(),
            }
            .into());
        }
        self.filter.filter(pose, timestamp)
    }

    /// Smoothed axis-angle of one joint, if seeded
    pub fn joint(&self, joint: usize) -> Option<[f64; 3]> {
        let base = joint * Self::AXES_PER_JOINT;
        let x = self.filter.channel_state(base)?.value;
        let y = self.filter.channel_state(base + 1)?.value;
        let z = self.filter.channel_state(base + 2)?.value;
        Some([x, y, z])
    }

    /// Underlying channel filter (for speed monitoring)
    pub fn inner(&self) -> &AdaptiveFilter {
        &self.filter
    }

    /// Drop all joint state
    pub fn reset(&mut self) {
        self.filter.reset();
    }

    /// Whether any joint has been seeded
    pub fn is_initialized(&self) -> bool {
        self.filter.is_initialized()
    }
}
