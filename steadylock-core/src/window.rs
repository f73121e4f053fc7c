//! Bounded FIFO Window for Stability Statistics
//!
//! ## Overview
//!
//! The stability test only ever looks at the most recent `W` samples. This
//! module provides the bounded first-in-first-out window those samples live
//! in. When the window is full, pushing a new sample evicts the oldest one.
//!
//! ## Design Rationale
//!
//! The capacity is chosen at runtime (it comes from a validated config
//! struct), so the window is backed by a `VecDeque` allocated once with the
//! configured capacity. After construction:
//!
//! - `push()` is O(1) and never reallocates
//! - `last()` is O(1)
//! - `iter()` walks oldest to newest
//!
//! The window is distinct from the full accumulated history kept by the
//! measurement lock. Only the window feeds the stability metric.
//!
//! ```text
//! capacity = 3
//!
//! push a  -> [a]
//! push b  -> [a, b]
//! push c  -> [a, b, c]
//! push d  -> [b, c, d]   (a evicted)
//! ```

use std::collections::{vec_deque, VecDeque};

/// Fixed-capacity sliding window, oldest sample evicted first
///
/// ## Internal Invariants
///
/// - `len() <= capacity()`
/// - iteration order is chronological
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T> SlidingWindow<T> {
    /// Creates an empty window holding at most `capacity` samples
    ///
    /// A capacity of zero is treated as one; configs reject it before this
    /// point.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds a sample, returning the evicted one when the window was full
    pub fn push(&mut self, sample: T) -> Option<T> {
        let evicted = if self.data.len() == self.capacity {
            self.data.pop_front()
        } else {
            None
        };
        self.data.push_back(sample);
        evicted
    }

    /// Number of stored samples
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if window is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if window is full
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    /// Maximum number of samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent sample
    pub fn last(&self) -> Option<&T> {
        self.data.back()
    }

    /// Iterate over samples from oldest to newest
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.data.iter()
    }

    /// Drop every sample
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl SlidingWindow<f64> {
    /// Contiguous copy of the scalar samples, oldest first
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }
}
