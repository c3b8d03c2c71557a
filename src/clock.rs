//! Monotonic millisecond clock
//!
//! All staleness checks in the crate compare `u64` millisecond timestamps
//! rather than sleeping on deadlines. Call sites take `now_ms` as an argument
//! so tests can drive time by hand; [`MonotonicClock`] supplies it at runtime.

use std::time::Instant;

/// Milliseconds elapsed since the clock was created
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock {
            origin: Instant::now(),
        }
    }

    /// Current timestamp in milliseconds
    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Milliseconds between `since` and `now`, zero if `since` lies in the future
pub fn elapsed_ms(now: u64, since: u64) -> u64 {
    now.saturating_sub(since)
}
