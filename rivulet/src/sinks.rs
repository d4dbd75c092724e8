// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Blocking consumers: `collect`/`collect_with_context`, the sinks every
//! test in this workspace is built on. `rivulet-test-utils` re-exports
//! these and adds the demo sinks (`PrintObserver`, `NoopObserver`) and
//! recording fixtures alongside them.

use crate::observable::Observable;
use rivulet_core::{Context, FnObserver, RivuletError};
use parking_lot::Mutex;
use std::sync::Arc;

/// Subscribes to `observable` under a fresh background context and blocks
/// until it reaches a terminal state, returning every value observed and
/// the terminal error, if any.
///
/// Hazardous on an observable that never terminates, same caveat as
/// [`Subscription::wait`](crate::Subscription::wait) — documented, not
/// prevented.
#[must_use]
pub fn collect<T>(observable: &Observable<T>) -> (Vec<T>, Option<RivuletError>)
where
    T: Send + 'static,
{
    collect_with_context(observable, Context::background())
}

/// Like [`collect`], but subscribes under the given `ctx` instead of a
/// fresh background context.
#[must_use]
pub fn collect_with_context<T>(observable: &Observable<T>, ctx: Context) -> (Vec<T>, Option<RivuletError>)
where
    T: Send + 'static,
{
    let values: Arc<Mutex<Vec<T>>> = Arc::new(Mutex::new(Vec::new()));
    let error: Arc<Mutex<Option<RivuletError>>> = Arc::new(Mutex::new(None));
    let values_next = Arc::clone(&values);
    let error_err = Arc::clone(&error);

    let subscription = observable.subscribe_with_context(
        ctx,
        FnObserver::new(
            move |_ctx, value| values_next.lock().push(value),
            move |_ctx, err| *error_err.lock() = Some(err),
            |_ctx| {},
        ),
    );
    subscription.wait();

    let values = std::mem::take(&mut *values.lock());
    let error = error.lock().take();
    (values, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{from_iter, throw};

    #[test]
    fn collect_gathers_values_and_no_error_on_clean_completion() {
        let (values, error) = collect(&from_iter(vec![1, 2, 3]));
        assert_eq!(values, vec![1, 2, 3]);
        assert!(error.is_none());
    }

    #[test]
    fn collect_reports_terminal_error() {
        let (values, error): (Vec<i32>, _) = collect(&throw(RivuletError::stream_error("boom")));
        assert!(values.is_empty());
        assert!(error.is_some());
    }

    #[test]
    fn collect_with_context_threads_the_given_context() {
        let ctx = Context::background().with_value("trace", 7i32);
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let observable = Observable::new(move |ctx, subscriber| {
            *seen_clone.lock() = ctx.get::<i32>("trace").map(|v| *v);
            subscriber.complete(ctx);
            None
        });
        collect_with_context(&observable, ctx);
        assert_eq!(*seen.lock(), Some(7));
    }
}
