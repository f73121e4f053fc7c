//! Integration tests for the stability locks
//!
//! Tests full lock cycles on realistic streams:
//! - Jittered scale factors through the calibration lock
//! - Glitches that break a streak and delay the lock
//! - Shape vectors with outliers through the measurement lock
//! - Filter, warm-up gate and lock chained the way a scan session uses them

mod common;

use common::{reference_shape, scale_stream, shape_stream, TestRng};
use steadylock_core::{
    filters::{KalmanConfig, ShapeFilter},
    lock::{LockState, LockWarning},
    stats,
    time::FixedClock,
    CalibrationLock, CalibrationLockConfig, LockError, MeasurementLock, MeasurementLockConfig, WarmupConfig,
    WarmupGate,
};

#[test]
fn calibration_locks_on_jittered_scale() {
    let mut rng = TestRng::new(7);
    let stream = scale_stream(&mut rng, 0.54, 0.01, 100);
    let mut lock = CalibrationLock::default();

    let mut locked_frame = None;
    for (i, &scale) in stream.iter().enumerate() {
        let snapshot = lock.add_measurement(scale).unwrap();
        assert!(snapshot.stability_score >= 0.0 && snapshot.stability_score <= 1.0);
        if snapshot.is_locked {
            locked_frame = Some(i + 1);
            break;
        }
    }

    assert_eq!(locked_frame, Some(31));
    let scale = lock.locked_scale().unwrap();
    assert!((scale - 0.54).abs() < 0.54 * 0.01, "locked scale {}", scale);
}

#[test]
fn glitch_delays_calibration_lock() {
    let mut lock = CalibrationLock::default();
    let mut frame = 0;

    for _ in 0..20 {
        frame += 1;
        lock.add_measurement(1.0).unwrap();
    }
    assert_eq!(lock.progress(), (19, 30));

    frame += 1;
    let snapshot = lock.add_measurement(2.0).unwrap();
    assert!(!snapshot.is_stable);
    assert!(snapshot.warnings.contains(&LockWarning::CounterReset { previous: 19 }));

    // The glitch stays in the 10-sample window for 10 frames
    loop {
        frame += 1;
        if lock.add_measurement(1.0).unwrap().is_locked {
            break;
        }
        assert!(frame < 200, "never locked");
    }

    assert_eq!(frame, 60);
    assert_eq!(lock.locked_scale(), Some(1.0));
}

#[test]
fn unstable_scale_never_locks() {
    let mut rng = TestRng::new(99);
    let stream = scale_stream(&mut rng, 1.0, 0.3, 500);
    let mut lock = CalibrationLock::default();

    for scale in stream {
        let snapshot = lock.add_measurement(scale).unwrap();
        assert!(!snapshot.is_locked);
    }
    assert_ne!(lock.state(), LockState::Locked);
}

#[test]
fn measurement_locks_after_ten_seconds() {
    let mut rng = TestRng::new(42);
    let center = reference_shape();
    let stream = shape_stream(&mut rng, &center, 0.01, 400);
    let mut lock = MeasurementLock::with_clock(MeasurementLockConfig::default(), FixedClock::from_millis(0).unwrap()).unwrap();

    let mut locked_frame = None;
    for (i, sample) in stream.iter().enumerate() {
        let snapshot = lock.add_measurement(sample).unwrap();
        if snapshot.is_locked {
            locked_frame = Some(i + 1);
            assert_eq!(snapshot.measurement_count, 300);
            assert_eq!(snapshot.confidence, 1.0);
            break;
        }
    }

    assert_eq!(locked_frame, Some(300));
    let median = lock.geometric_median().unwrap();
    for (m, c) in median.iter().zip(&center) {
        assert!((m - c).abs() < c.abs() * 0.01, "component {} vs {}", m, c);
    }
    assert!(lock.median_estimate().unwrap().iterations <= 100);
}

#[test]
fn measurement_median_resists_glitch() {
    let mut rng = TestRng::new(3);
    let center = reference_shape();
    let config = MeasurementLockConfig::default().with_lock_frame_threshold(30);
    let mut lock = MeasurementLock::with_clock(config, FixedClock::from_millis(0).unwrap()).unwrap();

    let glitch: Vec<f64> = center.iter().map(|c| c * 5.0).collect();
    let clean = shape_stream(&mut rng, &center, 0.01, 200);

    for sample in &clean[..10] {
        lock.add_measurement(sample).unwrap();
    }
    let snapshot = lock.add_measurement(&glitch).unwrap();
    assert!(!snapshot.is_stable);
    assert!(matches!(snapshot.warnings[0], LockWarning::HighVariation { frame: 11, .. }));

    for sample in &clean[10..] {
        if lock.add_measurement(sample).unwrap().is_locked {
            break;
        }
    }
    assert!(lock.is_locked());

    // The glitch is part of the committed history
    let history = lock.locked_measurements().unwrap();
    assert!(history.iter().any(|h| h == &glitch));

    let median = lock.geometric_median().unwrap();
    let mean_0 = stats::mean(&history.iter().map(|h| h[0]).collect::<Vec<_>>());
    assert!((median[0] - center[0]).abs() < center[0] * 0.02);
    assert!((mean_0 - center[0]).abs() > center[0] * 0.05);
}

#[test]
fn locked_instances_reject_and_reset() {
    let mut calibration = CalibrationLock::new(
        CalibrationLockConfig::default()
            .with_stable_frame_threshold(2)
            .with_window_size(2),
    )
    .unwrap();
    for _ in 0..3 {
        calibration.add_measurement(1.0).unwrap();
    }
    assert_eq!(calibration.add_measurement(1.0).unwrap_err(), LockError::AlreadyLocked);
    calibration.reset();
    assert_eq!(calibration.state(), LockState::Accumulating);

    let config = MeasurementLockConfig::default().with_lock_frame_threshold(1);
    let mut measurement = MeasurementLock::new(config).unwrap();
    measurement.add_measurement(&[1.0]).unwrap();
    assert_eq!(measurement.add_measurement(&[1.0]).unwrap_err(), LockError::AlreadyLocked);
    measurement.reset();
    assert!(measurement.add_measurement(&[2.0, 3.0]).unwrap().is_locked);
}

#[test]
fn filtered_scan_session() {
    let mut rng = TestRng::new(11);
    let center = reference_shape();
    let raw = shape_stream(&mut rng, &center, 0.04, 600);

    let mut warmup = WarmupGate::new(WarmupConfig::default());
    let mut filter = ShapeFilter::new(KalmanConfig::default()).unwrap();
    let config = MeasurementLockConfig::default().with_lock_frame_threshold(120);
    let mut lock = MeasurementLock::with_clock(config, FixedClock::from_millis(0).unwrap()).unwrap();

    for sample in &raw {
        let estimate = filter.update(sample).unwrap();
        if !warmup.update(sample).unwrap().is_stable {
            continue;
        }
        if lock.add_measurement(&estimate.state).unwrap().is_locked {
            break;
        }
    }

    assert!(warmup.is_stable());
    assert!(lock.is_locked());
    assert!(filter.max_uncertainty().unwrap() < 1.0);
    let median = lock.geometric_median().unwrap();
    for (m, c) in median.iter().zip(&center) {
        assert!((m - c).abs() < c.abs() * 0.05, "component {} vs {}", m, c);
    }
}
