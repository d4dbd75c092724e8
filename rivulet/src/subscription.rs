// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The subscription composite (§4.3, component C2): the teardown tree for
//! one running pipeline.
//!
//! A `Subscription` owns an ordered list of finalizers that run exactly
//! once, in registration order, when the subscription is unsubscribed.
//! Operators build trees of subscriptions — an outer subscription's
//! finalizer usually unsubscribes one or more inner subscriptions — so that
//! cancelling the outermost handle tears down everything underneath it.

use event_listener::Event;
use parking_lot::Mutex;
use rivulet_core::RivuletError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Finalizer = Box<dyn FnOnce() + Send>;

struct Inner {
    finalizers: Mutex<Vec<Finalizer>>,
    done: AtomicBool,
    done_event: Event,
}

/// A composite, idempotent teardown handle.
///
/// Cloning a `Subscription` yields another handle to the same underlying
/// composite — all clones observe the same `done` flag and share the same
/// finalizer list.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<Inner>,
}

impl Subscription {
    /// Creates a fresh, open subscription with no finalizers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                finalizers: Mutex::new(Vec::new()),
                done: AtomicBool::new(false),
                done_event: Event::new(),
            }),
        }
    }

    /// Registers `f` to run when this subscription is unsubscribed.
    ///
    /// If the subscription is already closed, `f` runs immediately instead
    /// of being queued — registering teardown after the fact must not
    /// silently leak it.
    pub fn add(&self, f: impl FnOnce() + Send + 'static) {
        if self.inner.done.load(Ordering::Acquire) {
            f();
            return;
        }
        let mut finalizers = self.inner.finalizers.lock();
        // Closed between the flag check and taking the lock: run inline.
        if self.inner.done.load(Ordering::Acquire) {
            drop(finalizers);
            f();
            return;
        }
        finalizers.push(Box::new(f));
    }

    /// Registers another subscription to be unsubscribed when this one is.
    pub fn add_unsubscribable(&self, child: Subscription) {
        self.add(move || child.unsubscribe());
    }

    /// Tears down the subscription: marks it closed and runs every
    /// registered finalizer, once, in registration order.
    ///
    /// Idempotent — a second call is a no-op. Finalizer panics are caught
    /// and joined into a single aggregate, then re-raised as one panic
    /// after every finalizer has had a chance to run.
    ///
    /// # Panics
    /// Panics with a [`RivuletError::MultipleErrors`] payload if one or
    /// more finalizers panicked.
    pub fn unsubscribe(&self) {
        if self.inner.done.swap(true, Ordering::AcqRel) {
            return;
        }
        let finalizers = std::mem::take(&mut *self.inner.finalizers.lock());
        let mut errors = Vec::new();
        for finalizer in finalizers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(finalizer)) {
                errors.push(RivuletError::observer_panic(RivuletError::panic_message(payload.as_ref())));
            }
        }
        self.inner.done_event.notify(usize::MAX);
        if !errors.is_empty() {
            std::panic::panic_any(RivuletError::aggregate(errors));
        }
    }

    /// Returns `true` once this subscription has been unsubscribed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.done.load(Ordering::Acquire)
    }

    /// Blocks the calling thread until this subscription is unsubscribed.
    ///
    /// Returns immediately if already closed, including when closed before
    /// `wait()` was even called. Hazardous on subscriptions that are never
    /// torn down — documented, not prevented.
    pub fn wait(&self) {
        if self.is_closed() {
            return;
        }
        let listener = self.inner.done_event.listen();
        if self.is_closed() {
            return;
        }
        listener.wait();
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering as AtoOrdering};

    #[test]
    fn finalizers_run_once_in_order() {
        let sub = Subscription::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            sub.add(move || order.lock().push(i));
        }
        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn add_after_close_runs_immediately() {
        let sub = Subscription::new();
        sub.unsubscribe();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        sub.add(move || flag.store(true, AtoOrdering::SeqCst));
        assert!(ran.load(AtoOrdering::SeqCst));
    }

    #[test]
    fn is_closed_reflects_state() {
        let sub = Subscription::new();
        assert!(!sub.is_closed());
        sub.unsubscribe();
        assert!(sub.is_closed());
    }

    #[test]
    fn wait_returns_immediately_if_already_closed() {
        let sub = Subscription::new();
        sub.unsubscribe();
        sub.wait();
    }

    #[test]
    fn wait_unblocks_on_unsubscribe_from_another_thread() {
        let sub = Subscription::new();
        let waiter = sub.clone();
        let handle = std::thread::spawn(move || waiter.wait());
        std::thread::sleep(std::time::Duration::from_millis(10));
        sub.unsubscribe();
        handle.join().unwrap();
    }

    #[test]
    fn add_unsubscribable_tears_down_child() {
        let parent = Subscription::new();
        let child = Subscription::new();
        parent.add_unsubscribable(child.clone());
        parent.unsubscribe();
        assert!(child.is_closed());
    }

    #[test]
    #[should_panic]
    fn unsubscribe_aggregates_panicking_finalizers() {
        let sub = Subscription::new();
        sub.add(|| panic!("first"));
        sub.add(|| panic!("second"));
        sub.unsubscribe();
    }

    #[test]
    fn counter_of_finalizer_runs_is_exactly_one() {
        let sub = Subscription::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        sub.add(move || {
            c.fetch_add(1, AtoOrdering::SeqCst);
        });
        sub.unsubscribe();
        sub.unsubscribe();
        sub.unsubscribe();
        assert_eq!(count.load(AtoOrdering::SeqCst), 1);
    }
}
