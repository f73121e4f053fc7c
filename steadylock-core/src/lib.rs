//! Streaming stabilizers for per-frame measurements
//!
//! Decides, frame by frame, how to smooth a noisy camera-derived stream,
//! when it has settled enough to lock, and what single robust value to
//! commit once it has.
//!
//! Key constraints:
//! - One synchronous call per frame, no I/O, no background work
//! - Every rejected input leaves the instance unchanged
//! - Locks are terminal until an explicit `reset()`
//!
//! ```
//! use steadylock_core::{MeasurementLock, MeasurementLockConfig};
//!
//! let mut lock = MeasurementLock::new(MeasurementLockConfig::default())?;
//!
//! // One shape vector per processed frame
//! let snapshot = lock.add_measurement(&[0.31, -0.12, 0.05])?;
//! assert!(!snapshot.is_locked);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod constants;
pub mod errors;
pub mod filters;
pub mod lock;
pub mod speed;
pub mod stats;
pub mod time;
pub mod warmup;
pub mod window;

// Public API
pub use errors::{ConfigError, FilterError, LockError, ValidationError};
pub use filters::{AdaptiveFilter, KalmanConfig, LinearStateFilter, OneEuroConfig, PoseFilter, ShapeFilter};
pub use lock::{
    CalibrationLock, CalibrationLockConfig, LockState, LockWarning, MeasurementLock, MeasurementLockConfig,
    MeasurementSnapshot, StabilitySnapshot, UniversalMeasurementId,
};
pub use speed::{RotationSpeedMonitor, SpeedMonitorConfig, SpeedWarning};
pub use warmup::{WarmupConfig, WarmupGate, WarmupSnapshot};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
