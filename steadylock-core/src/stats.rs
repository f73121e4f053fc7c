//! Window Statistics and Robust Estimation
//!
//! ## Overview
//!
//! Pure functions used by the stability locks:
//!
//! - **Dispersion**: population standard deviation and coefficient of
//!   variation (CV = σ / μ) over a stability window
//! - **Vector dispersion**: the maximum per-dimension CV, so the noisiest
//!   dimension governs stability
//! - **Robust center**: the geometric median via Weiszfeld's algorithm
//!
//! ## Degenerate Windows
//!
//! ```text
//! all samples identical      -> CV = 0 exactly (no rounding residue)
//! scalar mean == 0           -> CV = +inf (frame is never stable)
//! dimension |mean| <= 1e-10  -> that dimension is +inf and ignored by the
//!                               max unless no dimension is finite
//! ```
//!
//! ## Weiszfeld's Algorithm
//!
//! The geometric median minimizes Σ‖xᵢ − m‖. Starting from the arithmetic
//! mean, each step replaces the estimate with the inverse-distance weighted
//! average of the points:
//!
//! ```text
//! wᵢ    = 1 / max(‖xᵢ − m‖, ε)
//! m_new = Σ wᵢ·xᵢ / Σ wᵢ
//! ```
//!
//! Iteration stops once ‖m_new − m‖ < tolerance or the budget is spent.
//! One far outlier among many clustered points moves the result by far less
//! than it moves the mean.

use serde::{Deserialize, Serialize};

use crate::constants::MEDIAN_DISTANCE_FLOOR;

/// Means at or below this magnitude make a dimension's CV undefined
const NEAR_ZERO_MEAN: f64 = 1e-10;

/// Arithmetic mean, 0.0 for an empty slice
///
/// Finite input always yields a finite mean: when the plain sum overflows,
/// each term is divided by `n` before summing.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let sum = values.iter().sum::<f64>();
    if sum.is_finite() {
        sum / n
    } else {
        values.iter().map(|v| v / n).sum()
    }
}

/// Population standard deviation (divides by n), 0.0 for fewer than 2 values
pub fn population_std(values: &[f64]) -> f64 {
    if values.len() < 2 || all_equal(values.iter().copied()) {
        return 0.0;
    }
    let mu = mean(values);
    let variance = values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Coefficient of variation σ / μ
///
/// Empty input yields 0.0. A zero mean yields `f64::INFINITY`.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    if mu == 0.0 {
        return f64::INFINITY;
    }
    population_std(values) / mu
}

/// Maximum per-dimension CV over a window of equal-length vectors
///
/// Dimensions whose mean is indistinguishable from zero are skipped; if no
/// dimension has a finite CV the result is `f64::INFINITY`. An empty window
/// yields 0.0.
pub fn max_dimension_cv<'a, I>(window: I, dimension: usize) -> f64
where
    I: Iterator<Item = &'a [f64]> + Clone,
{
    if window.clone().next().is_none() || dimension == 0 {
        return 0.0;
    }

    let mut worst: Option<f64> = None;
    let mut column = Vec::new();
    for d in 0..dimension {
        column.clear();
        column.extend(window.clone().map(|sample| sample[d]));

        let mu = mean(&column);
        if mu.abs() <= NEAR_ZERO_MEAN {
            continue;
        }
        let cv = population_std(&column) / mu.abs();
        worst = Some(worst.map_or(cv, |w| w.max(cv)));
    }

    worst.unwrap_or(f64::INFINITY)
}

/// Result of a geometric median computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianEstimate {
    /// The estimated median point
    pub point: Vec<f64>,
    /// Weiszfeld iterations performed
    pub iterations: u32,
    /// Whether the displacement fell below tolerance within budget
    pub converged: bool,
}

/// Geometric median of a set of equal-length points
///
/// Returns `None` for an empty set. The iterator is cloned once per pass, so
/// pass something cheap to clone (a slice iterator, a `VecDeque` iterator).
pub fn geometric_median<'a, I>(points: I, max_iterations: u32, tolerance: f64) -> Option<MedianEstimate>
where
    I: Iterator<Item = &'a [f64]> + Clone,
{
    let first = points.clone().next()?;
    let dimension = first.len();
    let count = points.clone().count() as f64;

    // Coincident points are their own median
    if points.clone().all(|point| point == first) {
        return Some(MedianEstimate {
            point: first.to_vec(),
            iterations: 0,
            converged: true,
        });
    }

    // Start from the arithmetic mean
    let mut median = vec![0.0; dimension];
    let mut column = Vec::new();
    for (d, m) in median.iter_mut().enumerate() {
        column.clear();
        column.extend(points.clone().map(|point| point[d]));
        *m = mean(&column);
    }

    let mut next = vec![0.0; dimension];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;

        next.iter_mut().for_each(|v| *v = 0.0);
        let mut weight_sum = 0.0;
        for point in points.clone() {
            let weight = 1.0 / distance(point, &median).max(MEDIAN_DISTANCE_FLOOR);
            weight_sum += weight;
            for (n, x) in next.iter_mut().zip(point) {
                *n += weight * x;
            }
        }

        if weight_sum < MEDIAN_DISTANCE_FLOOR {
            break;
        }
        for n in next.iter_mut() {
            *n /= weight_sum;
        }

        let delta = distance(&next, &median);
        std::mem::swap(&mut median, &mut next);

        if delta < tolerance {
            converged = true;
            break;
        }
    }

    if !converged {
        log::warn!(
            "Geometric median did not converge within {} iterations over {} points",
            max_iterations,
            count
        );
    }

    Some(MedianEstimate {
        point: median,
        iterations,
        converged,
    })
}

/// Euclidean distance between two equal-length vectors
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn all_equal(mut values: impl Iterator<Item = f64>) -> bool {
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}
