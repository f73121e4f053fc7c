//! Common test utilities for integration tests
//!
//! This module provides:
//! - A deterministic xorshift generator so runs are reproducible
//! - Signal generators for scale-factor and shape-vector streams
//! - Frame timestamps at the nominal capture rate

#![allow(dead_code)]

use steadylock_core::time::Timestamp;

/// Frame period at 30 fps, rounded to whole milliseconds
pub const FRAME_MS: Timestamp = 33;

/// Deterministic pseudo-random source
pub struct TestRng {
    state: u32,
}

impl TestRng {
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u32(&mut self) -> u32 {
        // Xorshift algorithm
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        self.state
    }

    /// Uniform in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u32() >> 8) as f64 / 16_777_216.0
    }

    pub fn gen_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }
}

/// Scale factor around `base` with uniform relative jitter of `±jitter`
pub fn scale_stream(rng: &mut TestRng, base: f64, jitter: f64, frames: usize) -> Vec<f64> {
    (0..frames)
        .map(|_| base * (1.0 + rng.gen_range(-jitter, jitter)))
        .collect()
}

/// Shape vectors around `center` with uniform relative jitter of `±jitter`
pub fn shape_stream(rng: &mut TestRng, center: &[f64], jitter: f64, frames: usize) -> Vec<Vec<f64>> {
    (0..frames)
        .map(|_| {
            center
                .iter()
                .map(|c| c * (1.0 + rng.gen_range(-jitter, jitter)))
                .collect()
        })
        .collect()
}

/// Reference body-shape vector with no zero components
pub fn reference_shape() -> Vec<f64> {
    vec![0.8, -0.4, 1.2, 0.3, -0.9, 0.5, 0.7, -0.2, 0.6, 1.1]
}

/// Timestamp of frame `index`
pub fn frame_time(index: usize) -> Timestamp {
    index as Timestamp * FRAME_MS
}
