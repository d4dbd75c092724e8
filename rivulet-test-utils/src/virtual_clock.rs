// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! A [`Clock`] that advances only when told to, so tests over the timed
//! operator family (`Delay`, `Timeout`, `BufferWithTime`, ...) don't need
//! to wait out real wall-clock durations.

use parking_lot::Mutex;
use rivulet_core::{CancellationToken, Clock};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Inner {
    base: Instant,
    offset: Mutex<Duration>,
    advanced: event_listener::Event,
}

/// A manually-driven clock: [`now`](Self::now) reflects `base + offset`,
/// where `offset` only moves forward via [`advance`](Self::advance) —
/// never via real elapsed wall-clock time.
pub struct VirtualClock {
    inner: Arc<Inner>,
}

impl VirtualClock {
    /// Creates a clock anchored at the real `Instant::now()`, with zero
    /// virtual offset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                base: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
                advanced: event_listener::Event::new(),
            }),
        }
    }

    /// Moves virtual time forward by `duration`, waking every thread
    /// blocked in [`sleep`](Clock::sleep) whose deadline this satisfies.
    pub fn advance(&self, duration: Duration) {
        *self.inner.offset.lock() += duration;
        self.inner.advanced.notify(usize::MAX);
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        self.inner.base + *self.inner.offset.lock()
    }

    fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        let deadline = self.now() + duration;
        loop {
            if cancel.is_cancelled() {
                return true;
            }
            if self.now() >= deadline {
                return false;
            }
            let listener = self.inner.advanced.listen();
            if cancel.is_cancelled() {
                return true;
            }
            if self.now() >= deadline {
                return false;
            }
            listener.wait_timeout(Duration::from_millis(25));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn now_only_moves_on_explicit_advance() {
        let clock = VirtualClock::new();
        let first = clock.now();
        thread::sleep(Duration::from_millis(5));
        assert_eq!(clock.now(), first);
        clock.advance(Duration::from_secs(1));
        assert!(clock.now() > first);
    }

    #[test]
    fn sleep_unblocks_once_advanced_far_enough() {
        let clock = Arc::new(VirtualClock::new());
        let woke = Arc::new(AtomicBool::new(false));
        let clock_waiter = Arc::clone(&clock);
        let woke_waiter = Arc::clone(&woke);
        let handle = thread::spawn(move || {
            let cancel = CancellationToken::new();
            let cancelled = clock_waiter.sleep(Duration::from_millis(50), &cancel);
            woke_waiter.store(!cancelled, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(10));
        assert!(!woke.load(Ordering::SeqCst));
        clock.advance(Duration::from_millis(100));
        handle.join().unwrap();
        assert!(woke.load(Ordering::SeqCst));
    }

    #[test]
    fn sleep_returns_true_on_cancellation() {
        let clock = VirtualClock::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(clock.sleep(Duration::from_secs(1), &cancel));
    }
}
