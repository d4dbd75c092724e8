// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The subscriber state machine: a monotonic guard around a user-supplied
//! [`Observer`], in one of three concurrency safety modes.
//!
//! States: `Active` → one of `{Errored, Completed, Cancelled}`. Once
//! terminal, every further notification is dropped and reported to the
//! process-wide dropped-notification hook rather than forwarded.

use crate::subscription::Subscription;
use parking_lot::Mutex;
use rivulet_core::{hooks, Context, Observer, RivuletError};
use std::cell::UnsafeCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// How a `Subscriber` serializes concurrent calls into the wrapped
/// observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Safety {
    /// Every entry point is serialized under a lock.
    Safe,
    /// No synchronization; the caller must already serialize calls.
    Unsafe,
    /// A compare-and-set guard drops events that arrive while another
    /// event is already in flight (backpressure = drop).
    EventuallySafe,
}

const ACTIVE: u8 = 0;
const ERRORED: u8 = 1;
const COMPLETED: u8 = 2;
const CANCELLED: u8 = 3;

enum Storage<T> {
    Safe(Mutex<Box<dyn Observer<T>>>),
    Unsafe(UnsafeCell<Box<dyn Observer<T>>>),
    EventuallySafe {
        busy: AtomicBool,
        cell: UnsafeCell<Box<dyn Observer<T>>>,
    },
}

// SAFETY: `Unsafe` trusts the caller to serialize access; `EventuallySafe`
// enforces exclusive access itself via the `busy` compare-and-set. `Safe`
// needs no extra assertion since `Mutex` is already `Sync`.
unsafe impl<T: Send> Sync for Storage<T> {}

struct Inner<T> {
    state: AtomicU8,
    storage: Storage<T>,
    subscription: Subscription,
}

/// A shared handle to the subscriber state machine wrapping one observer.
///
/// Cheaply cloneable: every clone refers to the same underlying state, so
/// an `Observable`'s production function can hand a `Subscriber` to a
/// background thread (timers, detached workers) and keep emitting into it.
pub struct Subscriber<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> Subscriber<T> {
    /// Wraps `observer` in a subscriber using the given safety mode,
    /// attached to a fresh [`Subscription`].
    #[must_use]
    pub fn new(observer: Box<dyn Observer<T>>, safety: Safety) -> Self {
        Self::with_subscription(observer, safety, Subscription::new())
    }

    /// Wraps `observer` in a subscriber attached to an existing
    /// subscription, instead of allocating a fresh one.
    #[must_use]
    pub fn with_subscription(observer: Box<dyn Observer<T>>, safety: Safety, subscription: Subscription) -> Self {
        let storage = match safety {
            Safety::Safe => Storage::Safe(Mutex::new(observer)),
            Safety::Unsafe => Storage::Unsafe(UnsafeCell::new(observer)),
            Safety::EventuallySafe => Storage::EventuallySafe {
                busy: AtomicBool::new(false),
                cell: UnsafeCell::new(observer),
            },
        };
        Self {
            inner: Arc::new(Inner {
                state: AtomicU8::new(ACTIVE),
                storage,
                subscription,
            }),
        }
    }

    /// The subscription this subscriber's teardown is attached to.
    #[must_use]
    pub fn subscription(&self) -> Subscription {
        self.inner.subscription.clone()
    }

    /// Registers a finalizer on the underlying subscription.
    pub fn add(&self, f: impl FnOnce() + Send + 'static) {
        self.inner.subscription.add(f);
    }

    /// Registers a child subscription to be torn down with this one.
    pub fn add_unsubscribable(&self, child: Subscription) {
        self.inner.subscription.add_unsubscribable(child);
    }

    /// Returns `true` if this subscriber has reached any terminal state.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) != ACTIVE
    }

    /// Returns `true` if this subscriber terminated via `on_error`.
    #[must_use]
    pub fn has_thrown(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == ERRORED
    }

    /// Returns `true` if this subscriber terminated via `on_complete`.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == COMPLETED
    }

    /// Delivers a value notification, catching any panic from the
    /// observer and converting it to an `Error` delivery.
    pub fn next(&self, ctx: Context, value: T) {
        if self.inner.state.load(Ordering::Acquire) != ACTIVE {
            hooks::report_dropped_notification(&ctx, "Next");
            return;
        }
        let outcome = self.with_observer(|observer| {
            catch_unwind(AssertUnwindSafe(|| observer.on_next(ctx.clone(), value)))
        });
        match outcome {
            DeliveryOutcome::Delivered(Ok(())) => {}
            DeliveryOutcome::Delivered(Err(payload)) => {
                self.error(ctx, RivuletError::observer_panic(RivuletError::panic_message(payload.as_ref())));
            }
            DeliveryOutcome::Dropped => hooks::report_dropped_notification(&ctx, "Next"),
        }
    }

    /// Delivers a terminal error, then unsubscribes. A no-op quirk,
    /// preserved intentionally: this library has no sentinel "nil error"
    /// to special-case, so every call to `error` is a real transition —
    /// callers that want a conditional error must check beforehand.
    pub fn error(&self, ctx: Context, error: RivuletError) {
        if self.inner.state.compare_exchange(ACTIVE, ERRORED, Ordering::AcqRel, Ordering::Acquire).is_err() {
            hooks::report_dropped_notification(&ctx, "Error");
            return;
        }
        let outcome = self.with_observer(|observer| {
            catch_unwind(AssertUnwindSafe(|| observer.on_error(ctx.clone(), error)))
        });
        if let DeliveryOutcome::Delivered(Err(payload)) = outcome {
            hooks::report_unhandled_error(&ctx, &RivuletError::observer_panic(RivuletError::panic_message(payload.as_ref())));
        }
        self.inner.subscription.unsubscribe();
    }

    /// Delivers terminal completion, then unsubscribes.
    pub fn complete(&self, ctx: Context) {
        if self.inner.state.compare_exchange(ACTIVE, COMPLETED, Ordering::AcqRel, Ordering::Acquire).is_err() {
            hooks::report_dropped_notification(&ctx, "Complete");
            return;
        }
        let outcome = self.with_observer(|observer| {
            catch_unwind(AssertUnwindSafe(|| observer.on_complete(ctx.clone())))
        });
        if let DeliveryOutcome::Delivered(Err(payload)) = outcome {
            self.inner.state.store(ERRORED, Ordering::Release);
            hooks::report_unhandled_error(&ctx, &RivuletError::observer_panic(RivuletError::panic_message(payload.as_ref())));
        }
        self.inner.subscription.unsubscribe();
    }

    /// Cancels the subscriber without delivering a terminal notification
    /// downstream (unsubscribe is silent, §5 "Cancellation").
    pub fn cancel(&self) {
        let _ = self.inner.state.compare_exchange(ACTIVE, CANCELLED, Ordering::AcqRel, Ordering::Acquire);
        self.inner.subscription.unsubscribe();
    }

    fn with_observer<R>(&self, f: impl FnOnce(&mut dyn Observer<T>) -> R) -> DeliveryOutcome<R> {
        match &self.inner.storage {
            Storage::Safe(mutex) => {
                let mut guard = mutex.lock();
                DeliveryOutcome::Delivered(f(guard.as_mut()))
            }
            Storage::Unsafe(cell) => {
                // SAFETY: caller contract for `Safety::Unsafe` guarantees no
                // concurrent access.
                let observer = unsafe { &mut *cell.get() };
                DeliveryOutcome::Delivered(f(observer.as_mut()))
            }
            Storage::EventuallySafe { busy, cell } => {
                if busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
                    return DeliveryOutcome::Dropped;
                }
                // SAFETY: `busy` grants exclusive access until reset below.
                let observer = unsafe { &mut *cell.get() };
                let result = f(observer.as_mut());
                busy.store(false, Ordering::Release);
                DeliveryOutcome::Delivered(result)
            }
        }
    }
}

enum DeliveryOutcome<R> {
    Delivered(R),
    Dropped,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivulet_core::{Context, FnObserver};
    use std::sync::atomic::{AtomicI32, Ordering as AtoOrdering};

    fn recording_observer() -> (Arc<AtomicI32>, Arc<AtomicBool>, Arc<AtomicBool>, Box<dyn Observer<i32>>) {
        let last = Arc::new(AtomicI32::new(0));
        let errored = Arc::new(AtomicBool::new(false));
        let completed = Arc::new(AtomicBool::new(false));
        let (l, e, c) = (Arc::clone(&last), Arc::clone(&errored), Arc::clone(&completed));
        let observer = FnObserver::new(
            move |_ctx, v| l.store(v, AtoOrdering::SeqCst),
            move |_ctx, _err| e.store(true, AtoOrdering::SeqCst),
            move |_ctx| c.store(true, AtoOrdering::SeqCst),
        );
        (last, errored, completed, Box::new(observer))
    }

    #[test]
    fn forwards_next_while_active() {
        let (last, _, _, observer) = recording_observer();
        let sub = Subscriber::new(observer, Safety::Safe);
        sub.next(Context::background(), 42);
        assert_eq!(last.load(AtoOrdering::SeqCst), 42);
    }

    #[test]
    fn drops_next_after_complete() {
        let (last, _, completed, observer) = recording_observer();
        let sub = Subscriber::new(observer, Safety::Safe);
        sub.complete(Context::background());
        assert!(completed.load(AtoOrdering::SeqCst));
        sub.next(Context::background(), 99);
        assert_eq!(last.load(AtoOrdering::SeqCst), 0);
    }

    #[test]
    fn error_transitions_and_unsubscribes() {
        let (_, errored, _, observer) = recording_observer();
        let sub = Subscriber::new(observer, Safety::Safe);
        sub.error(Context::background(), RivuletError::stream_error("boom"));
        assert!(errored.load(AtoOrdering::SeqCst));
        assert!(sub.has_thrown());
        assert!(sub.subscription().is_closed());
    }

    #[test]
    fn complete_is_idempotent() {
        let (_, _, completed, observer) = recording_observer();
        let sub = Subscriber::new(observer, Safety::Safe);
        sub.complete(Context::background());
        sub.complete(Context::background());
        assert!(completed.load(AtoOrdering::SeqCst));
    }

    #[test]
    fn eventually_safe_drops_under_contention() {
        let (last, _, _, observer) = recording_observer();
        let sub = Subscriber::new(observer, Safety::EventuallySafe);
        sub.next(Context::background(), 1);
        assert_eq!(last.load(AtoOrdering::SeqCst), 1);
    }

    #[test]
    fn observer_panic_on_next_converts_to_error() {
        struct Panicking;
        impl Observer<i32> for Panicking {
            fn on_next(&mut self, _ctx: Context, _value: i32) {
                panic!("boom");
            }
            fn on_error(&mut self, _ctx: Context, _error: RivuletError) {}
            fn on_complete(&mut self, _ctx: Context) {}
        }
        let sub = Subscriber::new(Box::new(Panicking), Safety::Safe);
        sub.next(Context::background(), 1);
        assert!(sub.has_thrown());
    }
}
