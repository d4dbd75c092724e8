// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The utility family (§4.5.6): `Tap`, `Retry`, `Catch`, `OnErrorReturn`,
//! `OnErrorResumeNextWith`, `Materialize`/`Dematerialize`, `SubscribeOn`,
//! `ObserveOn`, `Serialize`, `Pool`, `ThrowIfEmpty`, `DefaultIfEmpty`.
//!
//! `Delay`, `Iif`, and `Defer` — named alongside these in the original
//! catalog — live in [`super::timed`] and [`crate::sources`] respectively,
//! next to the rest of their own families.

use super::support::DeferredCancel;
use crate::observable::Observable;
use crate::subscriber::Subscriber;
use crate::subscription::Subscription;
use parking_lot::Mutex;
use rivulet_core::{real_clock, Clock, Context, FnObserver, Notification, RivuletError, RivuletTask, SharedClock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

impl<A: Send + 'static> Observable<A> {
    /// Runs side-effecting callbacks around each event without altering
    /// it; all three handlers run before the matching event reaches
    /// downstream.
    pub fn tap<OnNext, OnErr, OnComplete>(&self, on_next: OnNext, on_error: OnErr, on_complete: OnComplete) -> Observable<A>
    where
        OnNext: Fn(&A) + Send + Sync + 'static,
        OnErr: Fn(&RivuletError) + Send + Sync + 'static,
        OnComplete: Fn() + Send + Sync + 'static,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value: A| {
                        on_next(&value);
                        down.next(ctx, value);
                    },
                    move |ctx, error| {
                        on_error(&error);
                        down_err.error(ctx, error);
                    },
                    move |ctx| {
                        on_complete();
                        down_complete.complete(ctx);
                    },
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Resubscribes up to `max_attempts` times when the source errors,
    /// immediately and without delay. An error on the final attempt
    /// reaches downstream.
    pub fn retry(&self, max_attempts: usize) -> Observable<A> {
        self.retry_with_delay_inner(max_attempts, None, real_clock())
    }

    /// Like [`retry`](Self::retry), but waits `delay` (via [`real_clock`])
    /// between each resubscription attempt.
    pub fn retry_with_delay(&self, max_attempts: usize, delay: Duration) -> Observable<A> {
        self.retry_with_delay_on(max_attempts, delay, real_clock())
    }

    /// Like [`retry_with_delay`](Self::retry_with_delay), but against an
    /// explicit [`Clock`].
    pub fn retry_with_delay_on(&self, max_attempts: usize, delay: Duration, clock: SharedClock) -> Observable<A> {
        self.retry_with_delay_inner(max_attempts, Some(delay), clock)
    }

    fn retry_with_delay_inner(&self, max_attempts: usize, delay: Option<Duration>, clock: SharedClock) -> Observable<A> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let state = Arc::new(RetryState {
                upstream: upstream.clone(),
                ctx: ctx.clone(),
                downstream,
                attempts_left: AtomicUsize::new(max_attempts),
                delay,
                clock: SharedClock::clone(&clock),
                active: Mutex::new(None),
                pending: Mutex::new(None),
            });
            retry_attempt(Arc::clone(&state));
            Some(Box::new(move || {
                if let Some(active) = state.active.lock().take() {
                    active.unsubscribe();
                }
                if let Some(pending) = state.pending.lock().take() {
                    pending.cancel();
                }
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Replaces the error branch with a recovery observable chosen from
    /// the error that occurred; `recover`'s output is forwarded in place
    /// of the original error.
    pub fn catch<F>(&self, recover: F) -> Observable<A>
    where
        F: Fn(RivuletError) -> Observable<A> + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let recover = Arc::new(recover);
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let recovery = DeferredCancel::new();
            let down_next = downstream.clone();
            let down_complete = downstream.clone();
            let downstream_err = downstream;
            let recovery_for_err = Arc::clone(&recovery);
            let recover = Arc::clone(&recover);
            let source_sub = upstream.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |ctx, value| down_next.next(ctx, value),
                    move |ctx, error| {
                        let fallback = recover(error);
                        let down_next = downstream_err.clone();
                        let down_err = downstream_err.clone();
                        let down_complete = downstream_err.clone();
                        let sub = fallback.subscribe_with_context(
                            ctx,
                            FnObserver::new(
                                move |ctx, value| down_next.next(ctx, value),
                                move |ctx, error| down_err.error(ctx, error),
                                move |ctx| down_complete.complete(ctx),
                            ),
                        );
                        recovery_for_err.attach(sub);
                    },
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || {
                source_sub.unsubscribe();
                recovery.cancel();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Like [`catch`](Self::catch), but the fallback is a single fixed
    /// observable rather than one chosen per error.
    pub fn on_error_resume_next_with(&self, fallback: Observable<A>) -> Observable<A> {
        self.catch(move |_error| fallback.clone())
    }

    /// On error, emits `f(error)` as one final value, then completes —
    /// the error never reaches downstream as such.
    pub fn on_error_return<F>(&self, f: F) -> Observable<A>
    where
        F: Fn(RivuletError) -> A + Send + Sync + 'static,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| down.next(ctx, value),
                    move |ctx, error| {
                        down_err.next(ctx.clone(), f(error));
                        down_err.complete(ctx);
                    },
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Reifies every event as a [`Notification`]: `Next`/`Error`/`Complete`
    /// each arrive as a `Next(Notification::..)`, followed by a synthetic
    /// `Complete` — the stream itself never errors once materialized.
    pub fn materialize(&self) -> Observable<Notification<A>> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<Notification<A>>| {
            let down_next = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| down_next.next(ctx, Notification::Next(value)),
                    move |ctx, error| {
                        down_err.next(ctx.clone(), Notification::Error(error));
                        down_err.complete(ctx);
                    },
                    move |ctx| {
                        down_complete.next(ctx.clone(), Notification::Complete);
                        down_complete.complete(ctx);
                    },
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Forces downstream delivery to be serialized regardless of this
    /// observable's own [`safety`](Self::safety) tag, by re-subscribing
    /// through a fresh `Safe` production function.
    pub fn serialize(&self) -> Observable<A> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| down.next(ctx, value),
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Moves the act of subscribing — invoking the source's production
    /// function — onto a dedicated worker thread, instead of running it
    /// inline on the calling thread.
    pub fn subscribe_on(&self) -> Observable<A> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let deferred = DeferredCancel::new();
            let upstream = upstream.clone();
            let ctx_for_worker = ctx.clone();
            let down_next = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let deferred_for_worker = Arc::clone(&deferred);
            let task = RivuletTask::spawn(move |_cancel| {
                let sub = upstream.subscribe_with_context(
                    ctx_for_worker,
                    FnObserver::new(
                        move |ctx, value| down_next.next(ctx, value),
                        move |ctx, error| down_err.error(ctx, error),
                        move |ctx| down_complete.complete(ctx),
                    ),
                );
                deferred_for_worker.attach(sub);
            });
            Some(Box::new(move || {
                deferred.cancel();
                task.join();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Delivers every event to downstream from a single dedicated worker
    /// thread instead of the producer's own calling thread, via a bounded
    /// FIFO queue: a full queue blocks the producer, the basic
    /// backpressure policy named in §5.
    pub fn observe_on(&self, capacity: usize) -> Observable<A> {
        self.pool(1, capacity)
    }

    /// Like [`observe_on`](Self::observe_on), but spreads delivery across
    /// `workers` concurrent threads draining the same bounded queue.
    /// Downstream delivery is no longer guaranteed to preserve arrival
    /// order once `workers > 1` — a deliberate trade for throughput, and
    /// the reason `observe_on` is `pool(1, capacity)` rather than sharing
    /// its name.
    pub fn pool(&self, workers: usize, capacity: usize) -> Observable<A> {
        assert!(workers > 0, "pool requires at least one worker");
        assert!(capacity > 0, "pool requires a positive queue capacity");
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let (sender, receiver) = async_channel::bounded::<PoolEvent<A>>(capacity);
            let sender_next = sender.clone();
            let sender_err = sender.clone();
            let sender_complete = sender.clone();
            let source_sub = upstream.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |_ctx, value| {
                        let _ = sender_next.send_blocking(PoolEvent::Next(value));
                    },
                    move |_ctx, error| {
                        let _ = sender_err.send_blocking(PoolEvent::Error(error));
                        sender_err.close();
                    },
                    move |_ctx| {
                        let _ = sender_complete.send_blocking(PoolEvent::Complete);
                        sender_complete.close();
                    },
                ),
            );

            let mut tasks = Vec::with_capacity(workers);
            for _ in 0..workers {
                let receiver = receiver.clone();
                let downstream = downstream.clone();
                let ctx = ctx.clone();
                let task = RivuletTask::spawn(move |_cancel| {
                    while let Ok(event) = receiver.recv_blocking() {
                        match event {
                            PoolEvent::Next(value) => downstream.next(ctx.clone(), value),
                            PoolEvent::Error(error) => downstream.error(ctx.clone(), error),
                            PoolEvent::Complete => downstream.complete(ctx.clone()),
                        }
                    }
                });
                tasks.push(task);
            }

            Some(Box::new(move || {
                source_sub.unsubscribe();
                sender.close();
                for task in tasks {
                    task.join();
                }
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Errors with `f()` instead of completing, if the source completes
    /// having emitted no values at all.
    pub fn throw_if_empty<F>(&self, f: F) -> Observable<A>
    where
        F: Fn() -> RivuletError + Send + Sync + 'static,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let seen = Arc::new(AtomicBool::new(false));
            let seen_next = Arc::clone(&seen);
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        seen_next.store(true, Ordering::SeqCst);
                        down.next(ctx, value);
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| {
                        if seen.load(Ordering::SeqCst) {
                            down_complete.complete(ctx);
                        } else {
                            down_complete.error(ctx, f());
                        }
                    },
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Emits `default` once and then completes, if the source completes
    /// having emitted no values at all; otherwise passes values through
    /// unchanged.
    pub fn default_if_empty(&self, default: A) -> Observable<A>
    where
        A: Clone,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let seen = Arc::new(AtomicBool::new(false));
            let seen_next = Arc::clone(&seen);
            let default = default.clone();
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        seen_next.store(true, Ordering::SeqCst);
                        down.next(ctx, value);
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| {
                        if !seen.load(Ordering::SeqCst) {
                            down_complete.next(ctx.clone(), default.clone());
                        }
                        down_complete.complete(ctx);
                    },
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }
}

impl<A: Send + 'static> Observable<Notification<A>> {
    /// The inverse of [`materialize`](Observable::materialize): unwraps
    /// each `Notification` back into a real `Next`/`Error`/`Complete`
    /// event. Round-tripping through `materialize().dematerialize()` is
    /// the identity for `Next`/`Complete` (and for `Error`, up to the
    /// pipeline's usual single-terminal-event rule).
    pub fn dematerialize(&self) -> Observable<A> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, notification: Notification<A>| match notification {
                        Notification::Next(value) => down.next(ctx, value),
                        Notification::Error(error) => down.error(ctx, error),
                        Notification::Complete => down.complete(ctx),
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }
}

enum PoolEvent<A> {
    Next(A),
    Error(RivuletError),
    Complete,
}

struct RetryState<A> {
    upstream: Observable<A>,
    ctx: Context,
    downstream: Subscriber<A>,
    attempts_left: AtomicUsize,
    delay: Option<Duration>,
    clock: SharedClock,
    active: Mutex<Option<Subscription>>,
    pending: Mutex<Option<RivuletTask>>,
}

fn retry_attempt<A: Send + 'static>(state: Arc<RetryState<A>>) {
    let state_for_err = Arc::clone(&state);
    let down_next = state.downstream.clone();
    let down_err = state.downstream.clone();
    let down_complete = state.downstream.clone();
    let sub = state.upstream.subscribe_with_context(
        state.ctx.clone(),
        FnObserver::new(
            move |ctx, value| down_next.next(ctx, value),
            move |ctx, error| {
                let remaining = state_for_err.attempts_left.load(Ordering::SeqCst);
                if remaining == 0 {
                    down_err.error(ctx, error);
                    return;
                }
                state_for_err.attempts_left.fetch_sub(1, Ordering::SeqCst);
                match state_for_err.delay {
                    Some(delay) => {
                        let state_for_task = Arc::clone(&state_for_err);
                        let clock = SharedClock::clone(&state_for_err.clock);
                        let task = RivuletTask::spawn(move |cancel| {
                            if !clock.sleep(delay, &cancel) {
                                retry_attempt(state_for_task);
                            }
                        });
                        *state_for_err.pending.lock() = Some(task);
                    }
                    None => retry_attempt(state_for_err.clone()),
                }
            },
            move |ctx| down_complete.complete(ctx),
        ),
    );
    *state.active.lock() = Some(sub);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::collect;
    use crate::sources::{from_iter, throw};
    use std::sync::atomic::AtomicI32;

    #[test]
    fn tap_runs_side_effects_without_altering_values() {
        let seen = Arc::new(AtomicI32::new(0));
        let completed = Arc::new(AtomicBool::new(false));
        let seen_tap = Arc::clone(&seen);
        let completed_tap = Arc::clone(&completed);
        let observable = from_iter(vec![1, 2, 3]).tap(
            move |v| {
                seen_tap.fetch_add(*v, Ordering::SeqCst);
            },
            |_| {},
            move || completed_tap.store(true, Ordering::SeqCst),
        );
        let (values, error) = collect(&observable);
        assert_eq!(values, vec![1, 2, 3]);
        assert!(error.is_none());
        assert_eq!(seen.load(Ordering::SeqCst), 6);
        assert!(completed.load(Ordering::SeqCst));
    }

    #[test]
    fn retry_resubscribes_and_eventually_surfaces_the_error() {
        let attempts = Arc::new(AtomicI32::new(0));
        let attempts_source = Arc::clone(&attempts);
        let observable: Observable<i32> = Observable::new(move |ctx, subscriber| {
            attempts_source.fetch_add(1, Ordering::SeqCst);
            subscriber.error(ctx, RivuletError::stream_error("boom"));
            None
        });
        let (values, error) = collect(&observable.retry(2));
        assert!(values.is_empty());
        assert!(error.is_some());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn catch_falls_back_to_a_recovery_observable() {
        let observable = throw::<i32>(RivuletError::stream_error("boom")).catch(|_| from_iter(vec![9, 10]));
        let (values, error) = collect(&observable);
        assert_eq!(values, vec![9, 10]);
        assert!(error.is_none());
    }

    #[test]
    fn on_error_return_emits_a_fallback_value_then_completes() {
        let observable = throw::<i32>(RivuletError::stream_error("boom")).on_error_return(|_| -1);
        let (values, error) = collect(&observable);
        assert_eq!(values, vec![-1]);
        assert!(error.is_none());
    }

    #[test]
    fn on_error_resume_next_with_uses_the_fixed_fallback() {
        let observable = throw::<i32>(RivuletError::stream_error("boom")).on_error_resume_next_with(from_iter(vec![1]));
        let (values, _) = collect(&observable);
        assert_eq!(values, vec![1]);
    }

    #[test]
    fn materialize_then_dematerialize_is_identity_for_next_and_complete() {
        let observable = from_iter(vec![1, 2, 3]);
        let (values, error) = collect(&observable.materialize().dematerialize());
        assert_eq!(values, vec![1, 2, 3]);
        assert!(error.is_none());
    }

    #[test]
    fn materialize_reifies_the_terminal_error_as_a_value() {
        let observable = throw::<i32>(RivuletError::stream_error("boom"));
        let (values, error) = collect(&observable.materialize());
        assert_eq!(values.len(), 1);
        assert!(matches!(values[0], Notification::Error(_)));
        assert!(error.is_none());
    }

    #[test]
    fn serialize_preserves_values_and_completion() {
        let (values, error) = collect(&from_iter(vec![1, 2, 3]).serialize());
        assert_eq!(values, vec![1, 2, 3]);
        assert!(error.is_none());
    }

    #[test]
    fn subscribe_on_runs_the_source_and_preserves_results() {
        let (values, error) = collect(&from_iter(vec![1, 2, 3]).subscribe_on());
        assert_eq!(values, vec![1, 2, 3]);
        assert!(error.is_none());
    }

    #[test]
    fn observe_on_preserves_arrival_order() {
        let (values, error) = collect(&from_iter(vec![1, 2, 3, 4, 5]).observe_on(4));
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
        assert!(error.is_none());
    }

    #[test]
    fn pool_delivers_every_value_though_order_may_interleave() {
        let (mut values, error) = collect(&from_iter(vec![1, 2, 3, 4, 5]).pool(3, 8));
        values.sort();
        assert_eq!(values, vec![1, 2, 3, 4, 5]);
        assert!(error.is_none());
    }

    #[test]
    fn throw_if_empty_errors_when_no_value_was_ever_seen() {
        let observable: Observable<i32> = crate::sources::empty();
        let (values, error) = collect(&observable.throw_if_empty(|| RivuletError::stream_error("empty")));
        assert!(values.is_empty());
        assert!(error.is_some());
    }

    #[test]
    fn throw_if_empty_passes_through_when_a_value_was_seen() {
        let (values, error) = collect(&from_iter(vec![1]).throw_if_empty(|| RivuletError::stream_error("empty")));
        assert_eq!(values, vec![1]);
        assert!(error.is_none());
    }

    #[test]
    fn default_if_empty_substitutes_a_single_value() {
        let observable: Observable<i32> = crate::sources::empty();
        let (values, _) = collect(&observable.default_if_empty(42));
        assert_eq!(values, vec![42]);
    }

    #[test]
    fn default_if_empty_passes_through_when_non_empty() {
        let (values, _) = collect(&from_iter(vec![1, 2]).default_if_empty(42));
        assert_eq!(values, vec![1, 2]);
    }
}
