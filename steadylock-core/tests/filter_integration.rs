//! Integration tests for the smoothing filters
//!
//! Tests various filter behaviours on synthetic capture streams:
//! - Pose smoothing with rotation speed gating
//! - Kalman noise reduction on shape vectors
//! - Skipped frames and out-of-order timestamps

mod common;

use common::{frame_time, reference_shape, shape_stream, TestRng, FRAME_MS};
use steadylock_core::{
    filters::{AdaptiveFilter, KalmanConfig, OneEuroConfig, PoseFilter, ShapeFilter},
    RotationSpeedMonitor,
};

fn rotating_pose(joints: usize, rate_rad_per_s: f64, t_s: f64) -> Vec<f64> {
    let mut pose = vec![0.1; joints * 3];
    // root joint turns about the vertical axis
    pose[1] = rate_rad_per_s * t_s;
    pose
}

#[test]
fn slow_turn_is_safe_fast_turn_is_not() {
    let mut monitor = RotationSpeedMonitor::default();

    let mut slow = PoseFilter::body(OneEuroConfig::default()).unwrap();
    let mut fast = PoseFilter::body(OneEuroConfig::default()).unwrap();

    for i in 0..90 {
        let t = frame_time(i);
        let t_s = t as f64 / 1000.0;
        slow.filter(&rotating_pose(24, 0.01, t_s), t).unwrap();
        fast.filter(&rotating_pose(24, 2.0, t_s), t).unwrap();
    }

    assert!(monitor.check_speed_safe(slow.inner(), 30.0), "speed {}", monitor.last_speed());
    assert!(monitor.last_speed() > 0.0);

    let warning = monitor.check_speed_warning(fast.inner(), 30.0);
    assert!(warning.is_some(), "speed {}", monitor.last_speed());
}

#[test]
fn stopping_brings_speed_back_down() {
    let mut monitor = RotationSpeedMonitor::default();
    let mut pose = PoseFilter::new(OneEuroConfig::default(), 1).unwrap();

    let mut angle = 0.0;
    for i in 0..30 {
        angle += 2.0 * FRAME_MS as f64 / 1000.0;
        pose.filter(&[0.0, angle, 0.0], frame_time(i)).unwrap();
    }
    let moving = monitor.get_rotation_speed(pose.inner());

    for i in 30..300 {
        pose.filter(&[0.0, angle, 0.0], frame_time(i)).unwrap();
    }
    let stopped = monitor.get_rotation_speed(pose.inner());

    assert!(moving > 30.0);
    assert!(stopped < 1.0, "speed {}", stopped);
}

#[test]
fn adaptive_filter_tolerates_out_of_order_frames() {
    let mut filter = AdaptiveFilter::new(OneEuroConfig::default()).unwrap();
    filter.filter(&[1.0, 2.0], 1000).unwrap();
    let smoothed = filter.filter(&[1.5, 2.5], 1033).unwrap();

    // A late frame from the past returns the current estimate untouched
    assert_eq!(filter.filter(&[9.0, 9.0], 900).unwrap(), smoothed);
    assert_eq!(filter.channel_state(0).unwrap().last_update, 1033);
}

#[test]
fn kalman_reduces_noise() {
    let mut rng = TestRng::new(5);
    let center = reference_shape();
    let raw = shape_stream(&mut rng, &center, 0.05, 300);
    let mut filter = ShapeFilter::new(KalmanConfig::default()).unwrap();

    let mut raw_error = 0.0;
    let mut filtered_error = 0.0;
    for (i, sample) in raw.iter().enumerate() {
        let estimate = filter.update(sample).unwrap();
        if i < 50 {
            continue;
        }
        for d in 0..center.len() {
            raw_error += (sample[d] - center[d]).powi(2);
            filtered_error += (estimate.state[d] - center[d]).powi(2);
        }
    }

    assert!(filtered_error < raw_error * 0.5, "{} vs {}", filtered_error, raw_error);
}

#[test]
fn kalman_skipped_frames_grow_uncertainty() {
    let mut filter = ShapeFilter::new(KalmanConfig::default()).unwrap();
    let shape = reference_shape();
    for _ in 0..30 {
        filter.update(&shape).unwrap();
    }
    let settled = filter.mean_uncertainty().unwrap();

    for _ in 0..10 {
        filter.predict().unwrap();
    }
    let after_gap = filter.mean_uncertainty().unwrap();
    assert!(after_gap > settled);

    filter.update(&shape).unwrap();
    assert!(filter.mean_uncertainty().unwrap() < after_gap);
}
