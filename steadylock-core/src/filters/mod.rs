//! Smoothing Filters
//!
//! Two independent smoothers sit in front of the stability locks:
//!
//! - [`AdaptiveFilter`]: per-channel One Euro smoother for scalar channels
//!   (pose axis-angles, scale factors). Its derivative estimates also feed
//!   the rotation speed monitor.
//! - [`LinearStateFilter`]: constant-position Kalman filter over a
//!   fixed-dimension vector (body-shape parameters), with uncertainty.
//!
//! Both are optional; a caller may feed raw measurements straight into a
//! lock.

/// Fixed-size matrix helpers for the Kalman filter.
pub mod matrix;

/// Kalman filter.
pub mod kalman;

/// One Euro filter.
pub mod one_euro;

pub use kalman::{KalmanConfig, KalmanEstimate, LinearStateFilter, ShapeFilter};
pub use one_euro::{AdaptiveFilter, ChannelState, OneEuroConfig, PoseFilter};
