//! Per-frame quality gate
//!
//! ## Overview
//!
//! Decides whether a frame is usable for measurement. Two inputs feed the
//! decision:
//!
//! - a [`SegmentationSignal`] produced upstream by the person segmenter
//! - an optional shape vector, fed into a [`MeasurementLock`] whose
//!   stability score is reported alongside
//!
//! ```text
//! is_valid = user_in_frame && confidence >= confidence_threshold
//! ```
//!
//! Stability below `stability_threshold` is surfaced as a warning only; it
//! does not invalidate the frame. A locked measurement lock is not an
//! error here: the gate reports the locked score of 1.0.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use steadylock_core::{
    time::{SystemClock, TimeSource},
    MeasurementLock,
};

use crate::ToolError;

/// Default minimum segmentation confidence
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Default stability score below which a warning is attached
pub const DEFAULT_STABILITY_THRESHOLD: f64 = 0.3;

/// Gate thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityGateConfig {
    /// Minimum segmentation confidence for a valid frame
    pub confidence_threshold: f64,
    /// Stability score that triggers a low-stability warning
    pub stability_threshold: f64,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            stability_threshold: DEFAULT_STABILITY_THRESHOLD,
        }
    }
}

impl QualityGateConfig {
    /// Set confidence threshold
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set stability threshold
    pub fn with_stability_threshold(mut self, threshold: f64) -> Self {
        self.stability_threshold = threshold;
        self
    }

    /// Both thresholds must lie in [0, 1]
    pub fn validate(&self) -> Result<(), ToolError> {
        unit_interval(self.confidence_threshold, "confidence_threshold")?;
        unit_interval(self.stability_threshold, "stability_threshold")
    }
}

fn unit_interval(value: f64, parameter: &'static str) -> Result<(), ToolError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ToolError::InvalidThreshold { parameter, value })
    }
}

/// Output of the person segmenter for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentationSignal {
    /// Segmenter found a valid person mask
    pub user_in_frame: bool,
    /// Detection confidence in [0, 1]
    pub confidence: f64,
    /// Predicted mask IoU
    pub iou: Option<f64>,
    /// Mask stability reported by the segmenter
    pub stability_score: Option<f64>,
}

/// Verdict for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameQuality {
    /// A person is present
    pub user_in_frame: bool,
    /// Detection confidence, 0.0 without a person
    pub confidence: f64,
    /// Measurement stability in [0, 1]
    pub stability_score: f64,
    /// Predicted mask IoU
    pub iou: Option<f64>,
    /// Frame can be used for measurement
    pub is_valid: bool,
    /// Why the frame is degraded
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Frame validity from segmentation plus measurement stability
#[derive(Debug, Clone)]
pub struct FrameQualityGate<C: TimeSource = SystemClock> {
    config: QualityGateConfig,
    lock: Option<MeasurementLock<C>>,
}

impl FrameQualityGate<SystemClock> {
    /// Gate without stability tracking
    pub fn new(config: QualityGateConfig) -> Result<Self, ToolError> {
        config.validate()?;
        Ok(Self { config, lock: None })
    }
}

impl<C: TimeSource> FrameQualityGate<C> {
    /// Gate that feeds measurement vectors into `lock`
    pub fn with_measurement_lock(config: QualityGateConfig, lock: MeasurementLock<C>) -> Result<Self, ToolError> {
        config.validate()?;
        Ok(Self {
            config,
            lock: Some(lock),
        })
    }

    /// Gate thresholds
    pub fn config(&self) -> &QualityGateConfig {
        &self.config
    }

    /// Attached measurement lock
    pub fn measurement_lock(&self) -> Option<&MeasurementLock<C>> {
        self.lock.as_ref()
    }

    /// Analyze one frame
    ///
    /// `signal` is `None` when no segmenter ran for this frame. The
    /// measurement is ignored when no lock is attached.
    pub fn analyze(&mut self, signal: Option<&SegmentationSignal>, measurement: Option<&[f64]>) -> FrameQuality {
        let mut warnings = Vec::new();
        let mut user_in_frame = false;
        let mut confidence = 0.0;
        let mut stability_score = 0.0;
        let mut iou = None;

        match signal {
            Some(signal) if signal.user_in_frame => {
                user_in_frame = true;
                confidence = signal.confidence;
                iou = signal.iou;
                if let Some(score) = signal.stability_score {
                    stability_score = score;
                }
            }
            Some(_) => warnings.push("Segmentation detected no valid person".to_string()),
            None => warnings.push("Segmentation signal unavailable".to_string()),
        }

        if let (Some(measurement), Some(lock)) = (measurement, self.lock.as_mut()) {
            let result = if lock.is_locked() {
                Ok(lock.snapshot())
            } else {
                lock.add_measurement(measurement)
            };

            match result {
                Ok(snapshot) => {
                    stability_score = snapshot.stability_score;
                    if stability_score < self.config.stability_threshold {
                        warnings.push(format!(
                            "Low stability score: {:.3} (threshold: {})",
                            stability_score, self.config.stability_threshold
                        ));
                    }
                }
                Err(err) => {
                    warn!("Stability analysis failed: {}", err);
                    warnings.push(format!("Stability analysis error: {}", err));
                }
            }
        }

        let is_valid = user_in_frame && confidence >= self.config.confidence_threshold;
        debug!(
            "Frame quality: user={} confidence={:.3} stability={:.3} valid={}",
            user_in_frame, confidence, stability_score, is_valid
        );

        FrameQuality {
            user_in_frame,
            confidence,
            stability_score,
            iou,
            is_valid,
            warnings,
        }
    }

    /// Analyze a run of frames in order
    ///
    /// `measurements[i]` pairs with `signals[i]`; missing entries are
    /// treated as frames without a measurement.
    pub fn batch_analyze(
        &mut self,
        signals: &[SegmentationSignal],
        measurements: Option<&[Vec<f64>]>,
    ) -> Vec<FrameQuality> {
        signals
            .iter()
            .enumerate()
            .map(|(i, signal)| {
                let measurement = measurements.and_then(|m| m.get(i)).map(Vec::as_slice);
                self.analyze(Some(signal), measurement)
            })
            .collect()
    }

    /// Reset the attached lock
    pub fn reset(&mut self) {
        if let Some(lock) = self.lock.as_mut() {
            lock.reset();
        }
    }

    /// Share of frames with a person present, in percent
    pub fn detection_rate(results: &[FrameQuality]) -> f64 {
        if results.is_empty() {
            return 0.0;
        }
        let detected = results.iter().filter(|r| r.user_in_frame).count();
        detected as f64 / results.len() as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steadylock_core::{time::FixedClock, MeasurementLockConfig};

    fn person(confidence: f64) -> SegmentationSignal {
        SegmentationSignal {
            user_in_frame: true,
            confidence,
            iou: Some(0.9),
            stability_score: Some(0.8),
        }
    }

    fn empty_frame() -> SegmentationSignal {
        SegmentationSignal {
            user_in_frame: false,
            confidence: 0.7,
            iou: None,
            stability_score: None,
        }
    }

    fn gate_with_lock(frames: u32) -> FrameQualityGate<FixedClock> {
        let lock = MeasurementLock::with_clock(
            MeasurementLockConfig::default().with_lock_frame_threshold(frames),
            FixedClock::from_millis(0).unwrap(),
        )
        .unwrap();
        FrameQualityGate::with_measurement_lock(QualityGateConfig::default(), lock).unwrap()
    }

    #[test]
    fn thresholds_validated() {
        assert!(FrameQualityGate::new(QualityGateConfig::default()).is_ok());
        assert!(QualityGateConfig::default().with_confidence_threshold(1.5).validate().is_err());
        assert!(QualityGateConfig::default().with_stability_threshold(-0.1).validate().is_err());
        assert!(QualityGateConfig::default().with_stability_threshold(f64::NAN).validate().is_err());
    }

    #[test]
    fn confident_person_is_valid() {
        let mut gate = FrameQualityGate::new(QualityGateConfig::default()).unwrap();
        let quality = gate.analyze(Some(&person(0.5)), None);

        assert!(quality.is_valid);
        assert_eq!(quality.iou, Some(0.9));
        assert_eq!(quality.stability_score, 0.8);
        assert!(quality.warnings.is_empty());
    }

    #[test]
    fn low_confidence_is_invalid() {
        let mut gate = FrameQualityGate::new(QualityGateConfig::default()).unwrap();
        let quality = gate.analyze(Some(&person(0.49)), None);

        assert!(quality.user_in_frame);
        assert!(!quality.is_valid);
    }

    #[test]
    fn missing_person_zeroes_confidence() {
        let mut gate = FrameQualityGate::new(QualityGateConfig::default()).unwrap();

        let quality = gate.analyze(Some(&empty_frame()), None);
        assert!(!quality.is_valid);
        assert_eq!(quality.confidence, 0.0);
        assert_eq!(quality.warnings, vec!["Segmentation detected no valid person"]);

        let quality = gate.analyze(None, None);
        assert_eq!(quality.warnings, vec!["Segmentation signal unavailable"]);
    }

    #[test]
    fn lock_score_overrides_segmenter_score() {
        let mut gate = gate_with_lock(4);

        // One stable frame out of four
        let quality = gate.analyze(Some(&person(0.9)), Some(&[1.0, 2.0]));
        assert_eq!(quality.stability_score, 0.25);
        assert!(quality.is_valid);
        assert_eq!(quality.warnings, vec!["Low stability score: 0.250 (threshold: 0.3)"]);

        let quality = gate.analyze(Some(&person(0.9)), Some(&[1.0, 2.0]));
        assert_eq!(quality.stability_score, 0.5);
        assert!(quality.warnings.is_empty());
    }

    #[test]
    fn locked_lock_reports_full_stability() {
        let mut gate = gate_with_lock(2);
        for _ in 0..3 {
            gate.analyze(Some(&person(0.9)), Some(&[1.0, 2.0]));
        }
        assert!(gate.measurement_lock().unwrap().is_locked());

        let quality = gate.analyze(Some(&person(0.9)), Some(&[1.0, 2.0]));
        assert_eq!(quality.stability_score, 1.0);
        assert!(quality.warnings.is_empty());
    }

    #[test]
    fn rejected_measurement_becomes_warning() {
        let mut gate = gate_with_lock(30);
        let quality = gate.analyze(Some(&person(0.9)), Some(&[f64::NAN]));

        assert!(quality.is_valid);
        assert_eq!(quality.warnings.len(), 1);
        assert!(quality.warnings[0].starts_with("Stability analysis error: "));
    }

    #[test]
    fn batch_and_detection_rate() {
        let mut gate = FrameQualityGate::new(QualityGateConfig::default()).unwrap();
        let signals = [person(0.9), empty_frame(), person(0.2), empty_frame()];

        let results = gate.batch_analyze(&signals, None);
        assert_eq!(results.len(), 4);
        assert_eq!(results.iter().filter(|r| r.is_valid).count(), 1);
        assert_eq!(FrameQualityGate::<SystemClock>::detection_rate(&results), 50.0);
        assert_eq!(FrameQualityGate::<SystemClock>::detection_rate(&[]), 0.0);
    }

    #[test]
    fn empty_warnings_skipped_in_json() {
        let mut gate = FrameQualityGate::new(QualityGateConfig::default()).unwrap();
        let quality = gate.analyze(Some(&person(0.9)), None);
        let value = serde_json::to_value(&quality).unwrap();

        assert!(value.get("warnings").is_none());
        assert_eq!(value["is_valid"], serde_json::json!(true));
    }
}
