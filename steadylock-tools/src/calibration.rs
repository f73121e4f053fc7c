//! Calibration dialogue tools
//!
//! Each method is one tool a conversational agent can call while guiding a
//! user through scale calibration. Results are always returned, never
//! raised: a rejected frame comes back as `success == false` with the
//! reason in `message`.

use log::{debug, warn};
use serde_json::json;
use steadylock_core::{
    errors::ConfigResult, CalibrationLock, CalibrationLockConfig, LockError, StabilitySnapshot,
};

use crate::ToolResult;

/// Tool-call wrapper around a [`CalibrationLock`]
#[derive(Debug, Clone, Default)]
pub struct CalibrationTools {
    lock: CalibrationLock,
}

impl CalibrationTools {
    /// Create tools over a freshly configured lock
    pub fn new(config: CalibrationLockConfig) -> ConfigResult<Self> {
        Ok(Self {
            lock: CalibrationLock::new(config)?,
        })
    }

    /// Underlying lock
    pub fn lock(&self) -> &CalibrationLock {
        &self.lock
    }

    /// Report the current state without adding a measurement
    pub fn check_status(&self) -> ToolResult {
        debug!("Tool call: check_calibration_status");
        let snapshot = self.lock.snapshot();
        ToolResult::ok(
            json!({
                "is_locked": snapshot.is_locked,
                "is_stable": snapshot.is_stable,
                "stability_score": snapshot.stability_score,
                "stable_frame_count": snapshot.stable_frame_count,
                "coefficient_of_variation": snapshot.coefficient_of_variation,
                "measurements_count": snapshot.measurements_count,
            }),
            self.status_message(&snapshot),
            render_warnings(&snapshot),
        )
    }

    /// Feed one scale factor (mm per pixel) from the marker detector
    pub fn process_frame(&mut self, scale: f64) -> ToolResult {
        debug!("Tool call: process_calibration_frame({})", scale);
        match self.lock.add_measurement(scale) {
            Ok(snapshot) => ToolResult::ok(
                json!({
                    "is_locked": snapshot.is_locked,
                    "is_stable": snapshot.is_stable,
                    "stability_score": snapshot.stability_score,
                    "stable_frame_count": snapshot.stable_frame_count,
                    "progress_percentage": self.percent(snapshot.stable_frame_count),
                    "coefficient_of_variation": snapshot.coefficient_of_variation,
                }),
                self.progress_message(&snapshot),
                render_warnings(&snapshot),
            ),
            Err(err) => {
                let message = match err {
                    LockError::Invalid(_) => format!("Invalid measurement: {}", err),
                    LockError::AlreadyLocked => format!("Calibration error: {}", err),
                };
                warn!("process_calibration_frame failed: {}", err);
                ToolResult::failure(json!({}), message, vec![err.to_string()])
            }
        }
    }

    /// Progress toward the lock in user-facing terms
    pub fn progress(&self) -> ToolResult {
        debug!("Tool call: get_stability_progress");
        let snapshot = self.lock.snapshot();
        let total = self.threshold();
        ToolResult::ok(
            json!({
                "progress": snapshot.stability_score,
                "frames_remaining": self.frames_remaining(&snapshot),
                "stable_frame_count": snapshot.stable_frame_count,
                "total_required": total,
            }),
            format!("{}/{} stable frames", snapshot.stable_frame_count, total),
            Vec::new(),
        )
    }

    /// Return the committed scale factor, or how far off the lock still is
    pub fn finalize(&self) -> ToolResult {
        debug!("Tool call: finalize_calibration");
        match self.lock.locked_scale() {
            Some(scale) => ToolResult::ok(
                json!({ "locked_scale_factor": scale }),
                format!("Calibration locked at scale factor: {:.6} mm/px", scale),
                Vec::new(),
            ),
            None => {
                let remaining = self.frames_remaining(&self.lock.snapshot());
                warn!("finalize_calibration called before lock ({} frames remaining)", remaining);
                ToolResult::failure(
                    json!({ "frames_remaining": remaining }),
                    format!("Calibration not yet locked (need {} more stable frames)", remaining),
                    vec![format!("Need {} more stable frames before finalizing", remaining)],
                )
            }
        }
    }

    /// Start calibration over
    pub fn reset(&mut self) -> ToolResult {
        debug!("Tool call: reset_calibration");
        self.lock.reset();
        ToolResult::ok(
            json!({
                "is_locked": false,
                "stable_frame_count": 0,
            }),
            "Calibration reset successfully. Ready to start new calibration.",
            Vec::new(),
        )
    }

    fn threshold(&self) -> u32 {
        self.lock.config().stable_frame_threshold
    }

    fn frames_remaining(&self, snapshot: &StabilitySnapshot) -> u32 {
        self.threshold().saturating_sub(snapshot.stable_frame_count)
    }

    fn percent(&self, streak: u32) -> f64 {
        streak as f64 / self.threshold() as f64 * 100.0
    }

    fn status_message(&self, snapshot: &StabilitySnapshot) -> String {
        if snapshot.is_locked {
            "Calibration locked and complete".to_string()
        } else if snapshot.is_stable {
            format!("Stable! {}/{} frames captured", snapshot.stable_frame_count, self.threshold())
        } else if snapshot.measurements_count < self.lock.config().min_measurements {
            "Waiting for initial measurements".to_string()
        } else {
            format!("Unstable (CV: {:.4})", snapshot.coefficient_of_variation)
        }
    }

    fn progress_message(&self, snapshot: &StabilitySnapshot) -> String {
        let total = self.threshold();
        if snapshot.is_locked {
            return format!("Calibration complete! {}/{} stable frames achieved.", total, total);
        }

        let lead = if snapshot.is_stable { "Great!" } else { "Hold steady..." };
        format!(
            "{} Progress: {:.0}% ({}/{} stable frames)",
            lead,
            self.percent(snapshot.stable_frame_count),
            snapshot.stable_frame_count,
            total
        )
    }
}

fn render_warnings(snapshot: &StabilitySnapshot) -> Vec<String> {
    snapshot.warnings.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_tools(frames: u32) -> CalibrationTools {
        CalibrationTools::new(CalibrationLockConfig::default().with_stable_frame_threshold(frames)).unwrap()
    }

    #[test]
    fn fresh_status_waits_for_measurements() {
        let tools = CalibrationTools::default();
        let result = tools.check_status();

        assert!(result.success);
        assert_eq!(result.message, "Waiting for initial measurements");
        assert_eq!(result.data["is_locked"], json!(false));
        assert_eq!(result.data["measurements_count"], json!(0));
    }

    #[test]
    fn first_frame_asks_to_hold_steady() {
        let mut tools = CalibrationTools::default();
        let result = tools.process_frame(0.54);

        assert!(result.success);
        assert_eq!(result.message, "Hold steady... Progress: 0% (0/30 stable frames)");
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn progress_uses_configured_threshold() {
        let mut tools = short_tools(4);
        tools.process_frame(1.0);
        tools.process_frame(1.0);
        let result = tools.process_frame(1.0);

        assert_eq!(result.message, "Great! Progress: 50% (2/4 stable frames)");
        assert_eq!(result.data["progress_percentage"], json!(50.0));

        let progress = tools.progress();
        assert_eq!(progress.message, "2/4 stable frames");
        assert_eq!(progress.data["frames_remaining"], json!(2));
        assert_eq!(progress.data["total_required"], json!(4));

        assert_eq!(tools.check_status().message, "Stable! 2/4 frames captured");
    }

    #[test]
    fn unstable_status_reports_cv() {
        let mut tools = CalibrationTools::default();
        tools.process_frame(1.0);
        tools.process_frame(2.0);

        assert_eq!(tools.check_status().message, "Unstable (CV: 0.3333)");
    }

    #[test]
    fn finalize_before_lock_fails() {
        let mut tools = short_tools(4);
        tools.process_frame(1.0);
        tools.process_frame(1.0);
        tools.process_frame(1.0);

        let result = tools.finalize();
        assert!(!result.success);
        assert_eq!(result.message, "Calibration not yet locked (need 2 more stable frames)");
        assert_eq!(result.warnings, vec!["Need 2 more stable frames before finalizing"]);
        assert_eq!(result.data["frames_remaining"], json!(2));
    }

    #[test]
    fn full_cycle_locks_and_finalizes() {
        let mut tools = CalibrationTools::default();
        let mut last = None;
        for _ in 0..31 {
            last = Some(tools.process_frame(1.0));
        }
        let last = last.unwrap();

        assert_eq!(last.data["is_locked"], json!(true));
        assert_eq!(last.message, "Calibration complete! 30/30 stable frames achieved.");
        assert_eq!(tools.check_status().message, "Calibration locked and complete");

        let result = tools.finalize();
        assert!(result.success);
        assert_eq!(result.data["locked_scale_factor"], json!(1.0));
        assert_eq!(result.message, "Calibration locked at scale factor: 1.000000 mm/px");
    }

    #[test]
    fn rejected_frames_are_reported_not_raised() {
        let mut tools = short_tools(1);

        let invalid = tools.process_frame(-1.0);
        assert!(!invalid.success);
        assert!(invalid.message.starts_with("Invalid measurement: "));
        assert_eq!(invalid.data, json!({}));

        tools.process_frame(1.0);
        tools.process_frame(1.0);
        assert!(tools.lock().is_locked());

        let locked = tools.process_frame(1.0);
        assert!(!locked.success);
        assert!(locked.message.starts_with("Calibration error: "));
        assert_eq!(locked.warnings, vec![LockError::AlreadyLocked.to_string()]);
    }

    #[test]
    fn reset_starts_over() {
        let mut tools = short_tools(1);
        tools.process_frame(1.0);
        tools.process_frame(1.0);

        let result = tools.reset();
        assert!(result.success);
        assert_eq!(result.message, "Calibration reset successfully. Ready to start new calibration.");
        assert!(!tools.lock().is_locked());
        assert!(tools.process_frame(1.0).success);
    }
}
