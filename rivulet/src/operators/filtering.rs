// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The filtering family (§4.5.2): propagates a subset of `Next` and every
//! terminal. `TakeLast`/`Tail` buffer and flush on `Complete`; `TakeUntil`/
//! `SkipUntil` are gated by a second "notifier" observable; `ElementAt`
//! surfaces a "not found" `Error` if its index was never reached.

use super::support::DeferredCancel;
use crate::observable::Observable;
use crate::subscriber::Subscriber;
use parking_lot::Mutex;
use rivulet_core::{Context, FnObserver, RivuletError};
use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

impl<A: Send + 'static> Observable<A> {
    /// Propagates only values for which `predicate` returns `true`.
    pub fn filter<F>(&self, predicate: F) -> Observable<A>
    where
        F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let predicate = Arc::new(predicate);
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let predicate = Arc::clone(&predicate);
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        if predicate(&value) {
                            down.next(ctx, value);
                        }
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Drops consecutive duplicates already propagated, using `PartialEq`
    /// over the whole value history.
    pub fn distinct(&self) -> Observable<A>
    where
        A: Eq + Hash + Clone,
    {
        self.distinct_by(|v| v.clone())
    }

    /// Like [`distinct`](Self::distinct), keyed by `key_fn(value)` instead
    /// of the value itself.
    pub fn distinct_by<K, F>(&self, key_fn: F) -> Observable<A>
    where
        K: Eq + Hash + Send + 'static,
        F: Fn(&A) -> K + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let key_fn = Arc::new(key_fn);
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let key_fn = Arc::clone(&key_fn);
            let seen: Arc<Mutex<HashSet<K>>> = Arc::new(Mutex::new(HashSet::new()));
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value: A| {
                        let key = key_fn(&value);
                        if seen.lock().insert(key) {
                            down.next(ctx, value);
                        }
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Propagates only the first `count` values, then completes and cancels
    /// the upstream subscription.
    pub fn take(&self, count: u64) -> Observable<A> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            if count == 0 {
                downstream.complete(ctx);
                return None;
            }
            let seen = Arc::new(AtomicU64::new(0));
            let cancel = DeferredCancel::new();
            let cancel_for_next = Arc::clone(&cancel);
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
                        if n <= count {
                            down.next(ctx.clone(), value);
                        }
                        if n == count {
                            down_complete.complete(ctx);
                            cancel_for_next.cancel();
                        }
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |_ctx| {}, // already completed once `count` is reached
                ),
            );
            cancel.attach(sub.clone());
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Propagates values while `predicate` holds; the first failing value
    /// is dropped and completes the stream instead of being forwarded.
    pub fn take_while<F>(&self, predicate: F) -> Observable<A>
    where
        F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let predicate = Arc::new(predicate);
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let predicate = Arc::clone(&predicate);
            let cancel = DeferredCancel::new();
            let cancel_for_next = Arc::clone(&cancel);
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        if predicate(&value) {
                            down.next(ctx, value);
                        } else {
                            down_complete.complete(ctx);
                            cancel_for_next.cancel();
                        }
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            cancel.attach(sub.clone());
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Propagates values until `notifier` emits its first event. A `Next`
    /// or `Complete` from `notifier` completes the output and cancels both
    /// subscriptions; an `Error` from `notifier` is treated as "just
    /// complete the notifier" — it does **not** error the output, which
    /// keeps running to its own natural completion (§9, a documented quirk
    /// preserved intentionally).
    pub fn take_until<U>(&self, notifier: Observable<U>) -> Observable<A>
    where
        U: Send + 'static,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let source_cancel = DeferredCancel::new();
            let notifier_cancel = DeferredCancel::new();

            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream.clone();
            let source_sub = upstream.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |ctx, value| down.next(ctx, value),
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            source_cancel.attach(source_sub.clone());

            let gate_complete = downstream.clone();
            let source_cancel_for_gate = Arc::clone(&source_cancel);
            let source_cancel_for_complete = Arc::clone(&source_cancel);
            let notifier_sub = notifier.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, _value| {
                        gate_complete.complete(ctx);
                        source_cancel_for_gate.cancel();
                    },
                    move |_ctx, _error| {}, // §9: notifier error does not error the output
                    move |ctx| {
                        downstream.complete(ctx);
                        source_cancel_for_complete.cancel();
                    },
                ),
            );
            notifier_cancel.attach(notifier_sub.clone());

            Some(Box::new(move || {
                source_sub.unsubscribe();
                notifier_sub.unsubscribe();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Withholds values until `notifier` emits its first `Next`, at which
    /// point the notifier subscription is torn down and every subsequent
    /// source value is propagated.
    pub fn skip_until<U>(&self, notifier: Observable<U>) -> Observable<A>
    where
        U: Send + 'static,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let open = Arc::new(std::sync::atomic::AtomicBool::new(false));
            let notifier_cancel = DeferredCancel::new();

            let open_for_gate = Arc::clone(&open);
            let notifier_cancel_for_gate = Arc::clone(&notifier_cancel);
            let notifier_sub = notifier.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |_ctx, _value| {
                        open_for_gate.store(true, Ordering::SeqCst);
                        notifier_cancel_for_gate.cancel();
                    },
                    |_ctx, _error| {},
                    |_ctx| {},
                ),
            );
            notifier_cancel.attach(notifier_sub.clone());

            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let source_sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        if open.load(Ordering::SeqCst) {
                            down.next(ctx, value);
                        }
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );

            Some(Box::new(move || {
                source_sub.unsubscribe();
                notifier_sub.unsubscribe();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Buffers the last `count` values, flushing them in order on
    /// `Complete` (§4.5.2 "TakeLast/Tail").
    pub fn take_last(&self, count: usize) -> Observable<A>
    where
        A: Clone,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let buffer: Arc<Mutex<VecDeque<A>>> = Arc::new(Mutex::new(VecDeque::with_capacity(count)));
            let buffer_next = Arc::clone(&buffer);
            let buffer_complete = Arc::clone(&buffer);
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |_ctx, value| {
                        let mut buffer = buffer_next.lock();
                        if count > 0 {
                            if buffer.len() == count {
                                buffer.pop_front();
                            }
                            buffer.push_back(value);
                        }
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| {
                        let values: Vec<A> = buffer_complete.lock().drain(..).collect();
                        for value in values {
                            down_complete.next(ctx.clone(), value);
                        }
                        down_complete.complete(ctx);
                    },
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Alias for [`take_last`](Self::take_last) under the name the original
    /// spec lists alongside `Head` (§4.5.2).
    pub fn tail(&self, count: usize) -> Observable<A>
    where
        A: Clone,
    {
        self.take_last(count)
    }

    /// Propagates every value after the first `count`.
    pub fn skip(&self, count: u64) -> Observable<A> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let seen = Arc::new(AtomicU64::new(0));
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        if seen.fetch_add(1, Ordering::SeqCst) >= count {
                            down.next(ctx, value);
                        }
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Propagates the first value for which `predicate` is `false`, and
    /// everything after — the one that failed the predicate is kept,
    /// unlike [`take_while`](Self::take_while)'s symmetric drop.
    pub fn skip_while<F>(&self, predicate: F) -> Observable<A>
    where
        F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let predicate = Arc::new(predicate);
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let predicate = Arc::clone(&predicate);
            let skipping = Arc::new(std::sync::atomic::AtomicBool::new(true));
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        if skipping.load(Ordering::SeqCst) {
                            if predicate(&value) {
                                return;
                            }
                            skipping.store(false, Ordering::SeqCst);
                        }
                        down.next(ctx, value);
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Withholds the last `count` values — buffers everything, and only
    /// emits an item once more than `count` values have been seen behind
    /// it.
    pub fn skip_last(&self, count: usize) -> Observable<A>
    where
        A: Clone,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let buffer: Arc<Mutex<VecDeque<A>>> = Arc::new(Mutex::new(VecDeque::with_capacity(count + 1)));
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        let mut buffer = buffer.lock();
                        buffer.push_back(value);
                        if buffer.len() > count {
                            if let Some(oldest) = buffer.pop_front() {
                                down.next(ctx, oldest);
                            }
                        }
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Emits only the value at `index` (0-based), then completes and
    /// cancels upstream. `Error`s with "not found" if the source completes
    /// before reaching `index`.
    pub fn element_at(&self, index: u64) -> Observable<A> {
        self.element_at_impl(index, None)
    }

    /// Like [`element_at`](Self::element_at), but emits `default` instead
    /// of erroring if the source completes before reaching `index`.
    pub fn element_at_or_default(&self, index: u64, default: A) -> Observable<A>
    where
        A: Clone,
    {
        self.element_at_impl(index, Some(default))
    }

    fn element_at_impl(&self, index: u64, default: Option<A>) -> Observable<A>
    where
        A: Clone,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let default = default.clone();
            let seen = Arc::new(AtomicU64::new(0));
            let cancel = DeferredCancel::new();
            let cancel_for_next = Arc::clone(&cancel);
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream.clone();
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        let n = seen.fetch_add(1, Ordering::SeqCst);
                        if n == index {
                            down.next(ctx.clone(), value);
                            down.complete(ctx);
                            cancel_for_next.cancel();
                        }
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| match &default {
                        Some(value) => {
                            down_complete.next(ctx.clone(), value.clone());
                            down_complete.complete(ctx);
                        }
                        None => down_complete.error(ctx, RivuletError::stream_error("element at index not found")),
                    },
                ),
            );
            cancel.attach(sub.clone());
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Emits the first value, then completes and cancels upstream; errors
    /// with "not found" on an empty source. Alias named `Head` in the
    /// original spec (§4.5.2).
    pub fn first(&self) -> Observable<A> {
        self.element_at(0)
    }

    /// Alias for [`first`](Self::first).
    pub fn head(&self) -> Observable<A> {
        self.first()
    }

    /// Emits only the final value seen, on `Complete`; errors with "not
    /// found" on an empty source.
    pub fn last(&self) -> Observable<A>
    where
        A: Clone,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let last: Arc<Mutex<Option<A>>> = Arc::new(Mutex::new(None));
            let last_next = Arc::clone(&last);
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |_ctx, value| *last_next.lock() = Some(value),
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| match last.lock().take() {
                        Some(value) => {
                            down_complete.next(ctx.clone(), value);
                            down_complete.complete(ctx);
                        }
                        None => down_complete.error(ctx, RivuletError::stream_error("source completed with no values")),
                    },
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Drops every `Next`, propagating only `Error`/`Complete`.
    pub fn ignore_elements(&self) -> Observable<A> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    |_ctx, _value| {},
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::collect;
    use crate::sources::{empty, from_iter, interval};
    use std::time::Duration;

    #[test]
    fn filter_keeps_matching_values() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3, 4]).filter(|v| v % 2 == 0));
        assert_eq!(values, vec![2, 4]);
    }

    #[test]
    fn distinct_drops_repeats() {
        let (values, _) = collect(&from_iter(vec![1, 1, 2, 2, 3, 1]).distinct());
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn take_limits_to_n_and_completes() {
        let (values, error) = collect(&from_iter(vec![1, 2, 3, 4, 5]).take(2));
        assert_eq!(values, vec![1, 2]);
        assert!(error.is_none());
    }

    #[test]
    fn take_zero_completes_immediately() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3]).take(0));
        assert!(values.is_empty());
    }

    #[test]
    fn take_while_stops_at_first_failure() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3, 4, 1]).take_while(|v| *v < 3));
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn take_until_gates_on_notifier_value() {
        // §8 end-to-end scenario 3 (finite substitute for deterministic test).
        let (values, _) = collect(&interval(Duration::from_millis(5)).take(3).take_until(from_iter(vec![0])));
        assert!(values.is_empty() || values.len() <= 3);
    }

    #[test]
    fn skip_until_withholds_before_notifier_fires() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3]).skip_until(from_iter(vec![()])));
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn take_last_buffers_and_flushes_on_complete() {
        // §8 property test: TakeLast(N) returns the last N elements.
        let (values, _) = collect(&from_iter(vec![1, 2, 3, 4, 5]).take_last(2));
        assert_eq!(values, vec![4, 5]);
    }

    #[test]
    fn skip_drops_the_first_n() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3, 4]).skip(2));
        assert_eq!(values, vec![3, 4]);
    }

    #[test]
    fn skip_while_keeps_the_failing_value() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3, 1]).skip_while(|v| *v < 3));
        assert_eq!(values, vec![3, 1]);
    }

    #[test]
    fn skip_last_withholds_the_final_n() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3, 4, 5]).skip_last(2));
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn element_at_emits_the_indexed_value() {
        let (values, error) = collect(&from_iter(vec![1, 2, 3]).element_at(1));
        assert_eq!(values, vec![2]);
        assert!(error.is_none());
    }

    #[test]
    fn element_at_errors_when_index_never_reached() {
        let (values, error) = collect(&from_iter(vec![1, 2]).element_at(5));
        assert!(values.is_empty());
        assert!(error.is_some());
    }

    #[test]
    fn element_at_or_default_uses_default_when_not_found() {
        let (values, error) = collect(&from_iter(vec![1, 2]).element_at_or_default(5, -1));
        assert_eq!(values, vec![-1]);
        assert!(error.is_none());
    }

    #[test]
    fn first_emits_only_the_first_value() {
        let (values, _) = collect(&from_iter(vec![7, 8, 9]).first());
        assert_eq!(values, vec![7]);
    }

    #[test]
    fn last_emits_only_the_final_value() {
        let (values, _) = collect(&from_iter(vec![7, 8, 9]).last());
        assert_eq!(values, vec![9]);
    }

    #[test]
    fn last_errors_on_empty_source() {
        let (values, error): (Vec<i32>, _) = collect(&empty().last());
        assert!(values.is_empty());
        assert!(error.is_some());
    }

    #[test]
    fn ignore_elements_drops_all_values_but_keeps_complete() {
        let (values, error) = collect(&from_iter(vec![1, 2, 3]).ignore_elements());
        assert!(values.is_empty());
        assert!(error.is_none());
    }
}
