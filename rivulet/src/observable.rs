// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The observable contract: a producer described by a production function
//! `F(ctx, subscriber) -> Option<Teardown>`.
//!
//! Subscribing is cold by default — each call to [`Observable::subscribe`]
//! invokes the production function afresh, producing an independent
//! [`Subscription`]. `F` is trusted to honor the single-terminal-event
//! contract; panics escaping it are caught and converted to an `Error`
//! delivery on the downstream observer.

use crate::subscriber::{Safety, Subscriber};
use crate::subscription::Subscription;
use rivulet_core::{Context, Observer, RivuletError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// A side-effecting thunk run exactly once when a subscription tears down.
pub type Teardown = Box<dyn FnOnce() + Send>;

type Produce<T> = dyn Fn(Context, Subscriber<T>) -> Option<Teardown> + Send + Sync;

/// A describable, re-executable asynchronous sequence of values.
///
/// Every `Observable<T>` carries a [`Safety`] tag: `Safe` observables wrap
/// the caller's observer in a lock-serialized subscriber before running
/// their production function; `Unsafe` ones trust the production function
/// to already serialize its own calls (used by operators that demonstrably
/// do, to avoid a redundant lock).
pub struct Observable<T> {
    safety: Safety,
    produce: Arc<Produce<T>>,
}

// Written by hand instead of `#[derive(Clone)]`: the derive would add a
// spurious `T: Clone` bound even though cloning only touches the `Arc`,
// which is cheap regardless of `T`.
impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            safety: self.safety,
            produce: Arc::clone(&self.produce),
        }
    }
}

impl<T: Send + 'static> Observable<T> {
    /// Builds a safe observable: `Subscribe` wraps the caller's observer in
    /// a [`Safety::Safe`] subscriber before invoking `produce`.
    pub fn new(produce: impl Fn(Context, Subscriber<T>) -> Option<Teardown> + Send + Sync + 'static) -> Self {
        Self {
            safety: Safety::Safe,
            produce: Arc::new(produce),
        }
    }

    /// Builds an observable that trusts `produce` to already serialize its
    /// calls into the subscriber, skipping the lock `Safety::Safe` would
    /// otherwise add.
    pub fn new_unsafe(produce: impl Fn(Context, Subscriber<T>) -> Option<Teardown> + Send + Sync + 'static) -> Self {
        Self {
            safety: Safety::Unsafe,
            produce: Arc::new(produce),
        }
    }

    /// Subscribes `observer` under `ctx`, running the production function
    /// and returning the resulting [`Subscription`].
    ///
    /// A panic escaping the production function is caught and delivered as
    /// an `Error` on `observer` instead of unwinding through `subscribe`.
    pub fn subscribe_with_context(&self, ctx: Context, observer: impl Observer<T> + 'static) -> Subscription {
        let subscriber = Subscriber::new(Box::new(observer), self.safety);
        self.run(ctx, subscriber.clone());
        subscriber.subscription()
    }

    /// Subscribes `observer` under a fresh background context.
    pub fn subscribe(&self, observer: impl Observer<T> + 'static) -> Subscription {
        self.subscribe_with_context(Context::background(), observer)
    }

    /// Runs the production function against an existing subscriber,
    /// attaching any returned teardown to its subscription. Used by
    /// operators that build their own `Subscriber` (e.g. to reuse the
    /// downstream one directly, for `Unsafe` chains).
    pub fn run(&self, ctx: Context, subscriber: Subscriber<T>) {
        let subscription = subscriber.subscription();
        let produce = Arc::clone(&self.produce);
        let result = catch_unwind(AssertUnwindSafe(|| produce(ctx.clone(), subscriber.clone())));
        match result {
            Ok(Some(teardown)) => subscription.add(teardown),
            Ok(None) => {}
            Err(payload) => {
                subscriber.error(ctx, RivuletError::observer_panic(RivuletError::panic_message(payload.as_ref())));
            }
        }
    }

    /// The safety mode this observable was constructed with.
    #[must_use]
    pub fn safety(&self) -> Safety {
        self.safety
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivulet_core::FnObserver;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn production_function_runs_on_subscribe() {
        let observable = Observable::new(|ctx, subscriber| {
            subscriber.next(ctx.clone(), 1);
            subscriber.complete(ctx);
            None
        });
        let last = Arc::new(AtomicI32::new(0));
        let completed = Arc::new(AtomicBool::new(false));
        let (l, c) = (Arc::clone(&last), Arc::clone(&completed));
        observable.subscribe(FnObserver::new(
            move |_ctx, v| l.store(v, Ordering::SeqCst),
            |_ctx, _e| {},
            move |_ctx| c.store(true, Ordering::SeqCst),
        ));
        assert_eq!(last.load(Ordering::SeqCst), 1);
        assert!(completed.load(Ordering::SeqCst));
    }

    #[test]
    fn panic_in_production_function_becomes_error() {
        let observable: Observable<i32> = Observable::new(|_ctx, _subscriber| {
            panic!("boom");
        });
        let errored = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&errored);
        let subscription = observable.subscribe(FnObserver::new(
            |_ctx, _v: i32| {},
            move |_ctx, _e| flag.store(true, Ordering::SeqCst),
            |_ctx| {},
        ));
        assert!(errored.load(Ordering::SeqCst));
        assert!(subscription.is_closed());
    }

    #[test]
    fn each_subscribe_call_reruns_production_function() {
        let calls = Arc::new(AtomicI32::new(0));
        let counter = Arc::clone(&calls);
        let observable = Observable::new(move |ctx, subscriber| {
            counter.fetch_add(1, Ordering::SeqCst);
            subscriber.complete(ctx);
            None
        });
        observable.subscribe(FnObserver::new(|_, _: i32| {}, |_, _| {}, |_| {}));
        observable.subscribe(FnObserver::new(|_, _: i32| {}, |_, _| {}, |_| {}));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
