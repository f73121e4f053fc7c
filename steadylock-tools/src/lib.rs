//! In-process consumers of steadylock snapshots
//!
//! ## Overview
//!
//! The core crate answers "is this stream stable yet". This crate turns
//! those answers into something a conversational agent or a capture UI can
//! act on:
//!
//! - [`CalibrationTools`]: tool-call wrapper around a
//!   [`CalibrationLock`](steadylock_core::CalibrationLock). Every call
//!   returns a [`ToolResult`] with a JSON payload and a user-facing message.
//! - [`FrameQualityGate`]: combines a segmentation signal with an optional
//!   [`MeasurementLock`](steadylock_core::MeasurementLock) into a per-frame
//!   validity verdict.
//!
//! Neither type does transport. A caller that exposes tools over HTTP or
//! speech forwards [`ToolResult::to_json`] as-is.
//!
//! ```
//! use steadylock_tools::CalibrationTools;
//!
//! let mut tools = CalibrationTools::default();
//! let result = tools.process_frame(0.54);
//! assert!(result.success);
//! println!("{}", result.message);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod calibration;
pub mod quality;

pub use calibration::CalibrationTools;
pub use quality::{FrameQuality, FrameQualityGate, QualityGateConfig, SegmentationSignal};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors raised by the tools layer
#[derive(Error, Debug)]
pub enum ToolError {
    /// Result could not be encoded
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Threshold outside [0, 1]
    #[error("Invalid configuration: {parameter} must be within [0, 1], got {value}")]
    InvalidThreshold {
        /// Name of the offending field
        parameter: &'static str,
        /// The rejected value
        value: f64,
    },
}

/// Outcome of one tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the call did what was asked
    pub success: bool,
    /// Tool-specific payload
    pub data: serde_json::Value,
    /// Human-readable status line
    pub message: String,
    /// Diagnostics, rendered
    pub warnings: Vec<String>,
}

impl ToolResult {
    pub(crate) fn ok(data: serde_json::Value, message: impl Into<String>, warnings: Vec<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
            warnings,
        }
    }

    pub(crate) fn failure(data: serde_json::Value, message: impl Into<String>, warnings: Vec<String>) -> Self {
        Self {
            success: false,
            data,
            message: message.into(),
            warnings,
        }
    }

    /// Encode as a JSON object
    pub fn to_json(&self) -> Result<String, ToolError> {
        Ok(serde_json::to_string(self)?)
    }
}
