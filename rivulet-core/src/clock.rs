// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The wall-clock source behind the timed operator family (§4.5.4).
//!
//! Timed operators (`Delay`, `Interval`, `Timer`, `Timeout`,
//! `BufferWithTime`, `SampleTime`, `ThrottleTime`, ...) never call
//! `std::thread::sleep` or `Instant::now()` directly — they go through a
//! [`Clock`], so `rivulet-test-utils` can substitute a [`VirtualClock`] that
//! advances on demand instead of waiting out real wall-clock time.

use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of the current instant and the ability to block for a duration.
///
/// Blocking implementations (like [`RealClock`]) must still return promptly
/// when `cancel` is signalled during the sleep, so timed operators remain
/// cancellable without polling.
pub trait Clock: Send + Sync {
    /// The current instant, as this clock sees it.
    fn now(&self) -> Instant;

    /// Blocks the calling thread for `duration`, or until `cancel` fires,
    /// whichever comes first. Returns `true` if `cancel` fired first.
    fn sleep(&self, duration: Duration, cancel: &crate::CancellationToken) -> bool;
}

/// The default [`Clock`]: real wall-clock time via `Instant::now()` and
/// `std::thread::sleep`, woken early by cancellation.
#[derive(Clone, Copy, Debug, Default)]
pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration, cancel: &crate::CancellationToken) -> bool {
        cancel.wait_timeout(duration)
    }
}

/// A shared handle to a [`Clock`] implementation, the type timed operator
/// constructors actually take so callers can inject [`RealClock::default`]
/// or a test double interchangeably.
pub type SharedClock = Arc<dyn Clock>;

/// Returns a [`SharedClock`] wrapping [`RealClock`], the default used by
/// every timed operator constructor that doesn't take an explicit clock.
#[must_use]
pub fn real_clock() -> SharedClock {
    Arc::new(RealClock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CancellationToken;

    #[test]
    fn real_clock_now_advances() {
        let clock = RealClock;
        let first = clock.now();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.now() > first);
    }

    #[test]
    fn real_clock_sleep_returns_false_on_natural_expiry() {
        let clock = RealClock;
        let cancel = CancellationToken::new();
        assert!(!clock.sleep(Duration::from_millis(5), &cancel));
    }

    #[test]
    fn real_clock_sleep_returns_true_on_cancellation() {
        let clock = RealClock;
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(clock.sleep(Duration::from_secs(5), &cancel));
    }
}
