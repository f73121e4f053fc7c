//! Time handling for per-frame streams
//!
//! Frames arrive with a monotonically non-decreasing timestamp from the
//! capture pipeline. Filters only ever look at the difference between two
//! timestamps; wall-clock time is needed once, when a lock mints its
//! identifier.
//!
//! - Monotonic frame timestamps (`Timestamp`, milliseconds)
//! - Wall clock for lock instants (`TimeSource`)

use chrono::{DateTime, TimeZone, Utc};

/// Timestamp in milliseconds since capture start (or since epoch)
pub type Timestamp = u64;

/// Milliseconds per second, used to turn frame deltas into seconds
pub const MS_PER_SECOND: f64 = 1000.0;

/// Elapsed seconds between two frame timestamps
///
/// Returns `None` when `current` is not strictly after `previous`, which is
/// how out-of-order or duplicate frames are detected.
pub fn elapsed_seconds(previous: Timestamp, current: Timestamp) -> Option<f64> {
    if current <= previous {
        return None;
    }
    Some((current - previous) as f64 / MS_PER_SECOND)
}

/// Source of wall-clock time
pub trait TimeSource {
    /// Current wall-clock instant
    fn now(&self) -> DateTime<Utc>;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

impl FixedClock {
    /// Clock frozen at `millis` since the Unix epoch
    ///
    /// `None` when the instant is outside chrono's representable range.
    pub fn from_millis(millis: i64) -> Option<Self> {
        let instant = Utc.timestamp_millis_opt(millis).single()?;
        Some(Self { instant })
    }

    /// Move the clock forward
    pub fn advance_millis(&mut self, ms: i64) {
        self.instant += chrono::Duration::milliseconds(ms);
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Box<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
