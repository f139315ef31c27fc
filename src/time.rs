//! Monotonic Clock Abstraction
//!
//! The store never reads wall-clock time directly. Instead it is handed a
//! [`Clock`] at construction, which reports the current monotonic time as a
//! `Duration` offset from the clock's own epoch. All timestamps inside the
//! store (entry expiry times, bucket ids) live in that clock's timeline.
//!
//! Two implementations are provided:
//!
//! - [`MonotonicClock`]: the production clock, backed by
//!   [`std::time::Instant`]. Its epoch is the moment of construction.
//! - [`ManualClock`]: a clock that only moves when told to. This is what
//!   makes expiration testable — tests advance simulated time exactly and
//!   assert on the store's behavior at precise instants.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A source of monotonic time.
///
/// Implementations must be strictly non-decreasing: two consecutive calls to
/// [`now`](Clock::now) never go backwards. The returned duration is measured
/// from an epoch the clock itself chooses; only differences between readings
/// are meaningful.
pub trait Clock: Send + Sync + 'static {
    /// Returns the current monotonic time since the clock's epoch.
    fn now(&self) -> Duration;
}

/// The production clock, backed by [`Instant`].
///
/// The epoch is the moment the clock was created, so readings start near
/// zero and grow with real elapsed time.
#[derive(Debug)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Creates a clock whose epoch is now.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// A clock that advances only when explicitly told to.
///
/// Readings are exact and deterministic, which makes it the right clock for
/// tests that need to place expiry times on precise bucket boundaries.
///
/// # Example
///
/// ```
/// use ttlkv::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// assert_eq!(clock.now(), Duration::ZERO);
///
/// clock.advance(Duration::from_secs(61));
/// assert_eq!(clock.now(), Duration::from_secs(61));
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now_nanos: AtomicU64,
}

impl ManualClock {
    /// Creates a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.now_nanos
            .fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Sets the clock to an absolute reading.
    ///
    /// # Panics
    ///
    /// Panics if `to` is earlier than the current reading; a monotonic clock
    /// never goes backwards.
    pub fn set(&self, to: Duration) {
        let to_nanos = to.as_nanos() as u64;
        let current = self.now_nanos.load(Ordering::SeqCst);
        assert!(
            to_nanos >= current,
            "manual clock cannot move backwards ({:?} < current reading)",
            to
        );
        self.now_nanos.store(to_nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_nanos.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_clock_non_decreasing() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_manual_clock_starts_at_zero() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(5));
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now(), Duration::from_millis(5500));
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::new();
        clock.set(Duration::from_secs(100));
        assert_eq!(clock.now(), Duration::from_secs(100));
    }

    #[test]
    #[should_panic(expected = "cannot move backwards")]
    fn test_manual_clock_rejects_backwards() {
        let clock = ManualClock::new();
        clock.set(Duration::from_secs(10));
        clock.set(Duration::from_secs(5));
    }
}
