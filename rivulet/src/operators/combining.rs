// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The combining family (§4.5.3): operators that coordinate two or more
//! subscriptions. Pairwise combinators (`merge`, `combine_latest`, `zip`,
//! `concat`, `race`) take exactly one other observable — chain calls to
//! combine more than two. Higher-order flattening of an
//! `Observable<Observable<T>>` (`MergeAll`/`ConcatAll`/`CombineLatestAll`)
//! lives in [`super::flattening`] instead.

use super::support::DeferredCancel;
use crate::observable::Observable;
use crate::subscriber::Subscriber;
use parking_lot::Mutex;
use rivulet_core::FnObserver;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

impl<A: Send + 'static> Observable<A> {
    /// Interleaves `self` and `other` as their values arrive. Errors from
    /// either side propagate immediately and cancel the other; completes
    /// once both sides have completed.
    pub fn merge(&self, other: Observable<A>) -> Observable<A> {
        let left = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let errored = Arc::new(AtomicBool::new(false));
            let remaining = Arc::new(AtomicU8::new(2));

            let left_cancel = DeferredCancel::new();
            let right_cancel = DeferredCancel::new();

            macro_rules! wire {
                ($source:expr, $own_cancel:expr, $other_cancel:expr) => {{
                    let down_next = downstream.clone();
                    let down_err = downstream.clone();
                    let down_complete = downstream.clone();
                    let errored = Arc::clone(&errored);
                    let errored_complete = Arc::clone(&errored);
                    let remaining = Arc::clone(&remaining);
                    let other_cancel = Arc::clone(&$other_cancel);
                    let sub = $source.subscribe_with_context(
                        ctx.clone(),
                        FnObserver::new(
                            move |ctx, value| down_next.next(ctx, value),
                            move |ctx, error| {
                                if !errored.swap(true, Ordering::SeqCst) {
                                    down_err.error(ctx, error);
                                }
                                other_cancel.cancel();
                            },
                            move |ctx| {
                                if remaining.fetch_sub(1, Ordering::SeqCst) == 1 && !errored_complete.load(Ordering::SeqCst) {
                                    down_complete.complete(ctx);
                                }
                            },
                        ),
                    );
                    $own_cancel.attach(sub.clone());
                    sub
                }};
            }

            let left_sub = wire!(left, left_cancel, right_cancel);
            let right_sub = wire!(other, right_cancel, left_cancel);

            Some(Box::new(move || {
                left_sub.unsubscribe();
                right_sub.unsubscribe();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Alias for [`merge`](Self::merge).
    pub fn merge_with(&self, other: Observable<A>) -> Observable<A> {
        self.merge(other)
    }

    /// Projects each value through `project` into a new observable and
    /// merges every resulting inner observable concurrently with the
    /// output and with each other — the "flat map" of the reactive world.
    pub fn merge_map<B, F>(&self, project: F) -> Observable<B>
    where
        B: Send + 'static,
        F: Fn(A) -> Observable<B> + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let project = Arc::new(project);
        Observable::new(move |ctx, downstream: Subscriber<B>| {
            let project = Arc::clone(&project);
            let errored = Arc::new(AtomicBool::new(false));
            // 1 extra count represents "outer source still running"; it is
            // released when the outer completes, mirroring each inner's slot.
            let remaining = Arc::new(AtomicU8::new(1));
            let inner_subs: Arc<Mutex<Vec<crate::subscription::Subscription>>> = Arc::new(Mutex::new(Vec::new()));

            let down_next = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream.clone();
            let errored_outer = Arc::clone(&errored);
            let errored_for_complete = Arc::clone(&errored);
            let remaining_outer = Arc::clone(&remaining);
            let inner_subs_for_outer = Arc::clone(&inner_subs);
            let outer_sub = upstream.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |ctx, value| {
                        remaining_outer.fetch_add(1, Ordering::SeqCst);
                        let inner = project(value);
                        let down_next = down_next.clone();
                        let down_err = down_err.clone();
                        let down_complete = down_complete.clone();
                        let errored = Arc::clone(&errored_outer);
                        let errored_complete = Arc::clone(&errored_outer);
                        let remaining = Arc::clone(&remaining_outer);
                        let inner_sub = inner.subscribe_with_context(
                            ctx,
                            FnObserver::new(
                                move |ctx, value| down_next.next(ctx, value),
                                move |ctx, error| {
                                    if !errored.swap(true, Ordering::SeqCst) {
                                        down_err.error(ctx, error);
                                    }
                                },
                                move |ctx| {
                                    if remaining.fetch_sub(1, Ordering::SeqCst) == 1 && !errored_complete.load(Ordering::SeqCst) {
                                        down_complete.complete(ctx);
                                    }
                                },
                            ),
                        );
                        inner_subs_for_outer.lock().push(inner_sub);
                    },
                    move |ctx, error| {
                        if !errored_for_complete.swap(true, Ordering::SeqCst) {
                            down_err.error(ctx, error);
                        }
                    },
                    move |ctx| {
                        if remaining.fetch_sub(1, Ordering::SeqCst) == 1 && !errored.load(Ordering::SeqCst) {
                            down_complete.complete(ctx);
                        }
                    },
                ),
            );

            Some(Box::new(move || {
                outer_sub.unsubscribe();
                for inner_sub in inner_subs.lock().drain(..) {
                    inner_sub.unsubscribe();
                }
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Emits `(left, right)` whenever either side produces a value, once
    /// both sides have emitted at least once. Errors propagate immediately;
    /// completes once both sides have completed.
    pub fn combine_latest<B>(&self, other: Observable<B>) -> Observable<(A, B)>
    where
        A: Clone,
        B: Clone + Send + 'static,
    {
        let left = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<(A, B)>| {
            let latest_left: Arc<Mutex<Option<A>>> = Arc::new(Mutex::new(None));
            let latest_right: Arc<Mutex<Option<B>>> = Arc::new(Mutex::new(None));
            let errored = Arc::new(AtomicBool::new(false));
            let remaining = Arc::new(AtomicU8::new(2));

            let down_next = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream.clone();
            let latest_left_for_left = Arc::clone(&latest_left);
            let latest_right_for_left = Arc::clone(&latest_right);
            let errored_left = Arc::clone(&errored);
            let errored_left_complete = Arc::clone(&errored);
            let remaining_left = Arc::clone(&remaining);
            let left_sub = left.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |ctx, value: A| {
                        *latest_left_for_left.lock() = Some(value.clone());
                        if let Some(right) = latest_right_for_left.lock().clone() {
                            down_next.next(ctx, (value, right));
                        }
                    },
                    move |ctx, error| {
                        if !errored_left.swap(true, Ordering::SeqCst) {
                            down_err.error(ctx, error);
                        }
                    },
                    move |ctx| {
                        if remaining_left.fetch_sub(1, Ordering::SeqCst) == 1 && !errored_left_complete.load(Ordering::SeqCst) {
                            down_complete.complete(ctx);
                        }
                    },
                ),
            );

            let down_next = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let errored_right = Arc::clone(&errored);
            let errored_right_complete = Arc::clone(&errored);
            let remaining_right = Arc::clone(&remaining);
            let right_sub = other.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value: B| {
                        *latest_right.lock() = Some(value.clone());
                        if let Some(left) = latest_left.lock().clone() {
                            down_next.next(ctx, (left, value));
                        }
                    },
                    move |ctx, error| {
                        if !errored_right.swap(true, Ordering::SeqCst) {
                            down_err.error(ctx, error);
                        }
                    },
                    move |ctx| {
                        if remaining_right.fetch_sub(1, Ordering::SeqCst) == 1 && !errored_right_complete.load(Ordering::SeqCst) {
                            down_complete.complete(ctx);
                        }
                    },
                ),
            );

            Some(Box::new(move || {
                left_sub.unsubscribe();
                right_sub.unsubscribe();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Alias for [`combine_latest`](Self::combine_latest).
    pub fn combine_latest_with<B>(&self, other: Observable<B>) -> Observable<(A, B)>
    where
        A: Clone,
        B: Clone + Send + 'static,
    {
        self.combine_latest(other)
    }

    /// Pairs up values positionally: the Nth value of `self` with the Nth
    /// value of `other`. Completes as soon as either side completes *and*
    /// that side's own buffer of not-yet-paired values is empty — a side
    /// that completes while still holding unpaired values stays open until
    /// the other side's arrivals drain that buffer (or the other side
    /// completes first), so `Zip(Just(1,2,3), Just(a,b))` still emits both
    /// pairs instead of completing the instant the longer source finishes
    /// subscribing.
    pub fn zip<B>(&self, other: Observable<B>) -> Observable<(A, B)>
    where
        A: Send + 'static,
        B: Send + 'static,
    {
        let left = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<(A, B)>| {
            let left_buffer: Arc<Mutex<VecDeque<A>>> = Arc::new(Mutex::new(VecDeque::new()));
            let right_buffer: Arc<Mutex<VecDeque<B>>> = Arc::new(Mutex::new(VecDeque::new()));
            let left_done = Arc::new(AtomicBool::new(false));
            let right_done = Arc::new(AtomicBool::new(false));
            let terminated = Arc::new(AtomicBool::new(false));

            // Completes once either side is done *and* its own buffer of
            // unpaired values has drained to empty — a side can finish
            // subscribing (cold, synchronous sources do) while still
            // holding values that the other side hasn't caught up to yet.
            let try_complete = {
                let left_buffer = Arc::clone(&left_buffer);
                let right_buffer = Arc::clone(&right_buffer);
                let left_done = Arc::clone(&left_done);
                let right_done = Arc::clone(&right_done);
                let terminated = Arc::clone(&terminated);
                move |ctx: rivulet_core::Context, downstream: &Subscriber<(A, B)>| {
                    let exhausted = (left_done.load(Ordering::SeqCst) && left_buffer.lock().is_empty())
                        || (right_done.load(Ordering::SeqCst) && right_buffer.lock().is_empty());
                    if exhausted && !terminated.swap(true, Ordering::SeqCst) {
                        downstream.complete(ctx);
                    }
                }
            };

            let down_next = downstream.clone();
            let down_err = downstream.clone();
            let down_for_left_next = downstream.clone();
            let down_for_left_complete = downstream.clone();
            let left_buffer_for_left = Arc::clone(&left_buffer);
            let right_buffer_for_left = Arc::clone(&right_buffer);
            let left_done_for_complete = Arc::clone(&left_done);
            let terminated_for_next = Arc::clone(&terminated);
            let terminated_for_err = Arc::clone(&terminated);
            let try_complete_for_left_next = try_complete.clone();
            let try_complete_for_left_complete = try_complete.clone();
            let left_sub = left.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |ctx, value: A| {
                        if terminated_for_next.load(Ordering::SeqCst) {
                            return;
                        }
                        let paired = right_buffer_for_left.lock().pop_front();
                        match paired {
                            Some(right) => down_next.next(ctx.clone(), (value, right)),
                            None => left_buffer_for_left.lock().push_back(value),
                        }
                        try_complete_for_left_next(ctx, &down_for_left_next);
                    },
                    move |ctx, error| {
                        if !terminated_for_err.swap(true, Ordering::SeqCst) {
                            down_err.error(ctx, error);
                        }
                    },
                    move |ctx| {
                        left_done_for_complete.store(true, Ordering::SeqCst);
                        try_complete_for_left_complete(ctx, &down_for_left_complete);
                    },
                ),
            );

            let down_next = downstream.clone();
            let down_err = downstream.clone();
            let down_for_right_next = downstream.clone();
            let down_for_right_complete = downstream;
            let left_buffer_for_right = left_buffer;
            let right_buffer_for_right = right_buffer;
            let right_done_for_complete = right_done;
            let terminated_for_next2 = Arc::clone(&terminated);
            let terminated_for_err2 = terminated;
            let try_complete_for_right_next = try_complete.clone();
            let try_complete_for_right_complete = try_complete;
            let right_sub = other.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value: B| {
                        if terminated_for_next2.load(Ordering::SeqCst) {
                            return;
                        }
                        let paired = left_buffer_for_right.lock().pop_front();
                        match paired {
                            Some(left) => down_next.next(ctx.clone(), (left, value)),
                            None => right_buffer_for_right.lock().push_back(value),
                        }
                        try_complete_for_right_next(ctx, &down_for_right_next);
                    },
                    move |ctx, error| {
                        if !terminated_for_err2.swap(true, Ordering::SeqCst) {
                            down_err.error(ctx, error);
                        }
                    },
                    move |ctx| {
                        right_done_for_complete.store(true, Ordering::SeqCst);
                        try_complete_for_right_complete(ctx, &down_for_right_complete);
                    },
                ),
            );

            Some(Box::new(move || {
                left_sub.unsubscribe();
                right_sub.unsubscribe();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Alias for [`zip`](Self::zip).
    pub fn zip_with<B>(&self, other: Observable<B>) -> Observable<(A, B)>
    where
        A: Send + 'static,
        B: Send + 'static,
    {
        self.zip(other)
    }

    /// Subscribes to `other` only once `self` completes, forwarding `self`'s
    /// values first and then `other`'s.
    pub fn concat(&self, other: Observable<A>) -> Observable<A> {
        let left = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let right_cancel = DeferredCancel::new();

            let down_next = downstream.clone();
            let down_err = downstream.clone();
            let ctx_for_right = ctx.clone();
            let right_cancel_for_left = Arc::clone(&right_cancel);
            let other = other.clone();
            let left_sub = left.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| down_next.next(ctx, value),
                    move |ctx, error| down_err.error(ctx, error),
                    move |_ctx| {
                        let down_next = downstream.clone();
                        let down_err = downstream.clone();
                        let down_complete = downstream.clone();
                        let right_sub = other.subscribe_with_context(
                            ctx_for_right.clone(),
                            FnObserver::new(
                                move |ctx, value| down_next.next(ctx, value),
                                move |ctx, error| down_err.error(ctx, error),
                                move |ctx| down_complete.complete(ctx),
                            ),
                        );
                        right_cancel_for_left.attach(right_sub);
                    },
                ),
            );

            Some(Box::new(move || {
                left_sub.unsubscribe();
                right_cancel.cancel();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Alias for [`concat`](Self::concat).
    pub fn concat_with(&self, other: Observable<A>) -> Observable<A> {
        self.concat(other)
    }

    /// Subscribes to both `self` and `other`; whichever delivers its first
    /// event wins, the loser's subscription is cancelled, and only the
    /// winner's subsequent events are forwarded.
    pub fn race(&self, other: Observable<A>) -> Observable<A> {
        let left = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let winner = Arc::new(AtomicU8::new(0)); // 0 = undecided, 1 = left, 2 = right
            let left_cancel = DeferredCancel::new();
            let right_cancel = DeferredCancel::new();

            macro_rules! wire {
                ($source:expr, $id:expr, $own_cancel:expr, $other_cancel:expr) => {{
                    let down_next = downstream.clone();
                    let down_err = downstream.clone();
                    let down_complete = downstream.clone();
                    let winner = Arc::clone(&winner);
                    let winner_err = Arc::clone(&winner);
                    let winner_complete = Arc::clone(&winner);
                    let other_cancel = Arc::clone(&$other_cancel);
                    let other_cancel_err = Arc::clone(&$other_cancel);
                    let other_cancel_complete = Arc::clone(&$other_cancel);
                    let sub = $source.subscribe_with_context(
                        ctx.clone(),
                        FnObserver::new(
                            move |ctx, value| {
                                let decided = winner.compare_exchange(0, $id, Ordering::SeqCst, Ordering::SeqCst);
                                if decided.is_ok() {
                                    other_cancel.cancel();
                                }
                                if winner.load(Ordering::SeqCst) == $id {
                                    down_next.next(ctx, value);
                                }
                            },
                            move |ctx, error| {
                                let decided = winner_err.compare_exchange(0, $id, Ordering::SeqCst, Ordering::SeqCst);
                                if decided.is_ok() {
                                    other_cancel_err.cancel();
                                }
                                if winner_err.load(Ordering::SeqCst) == $id {
                                    down_err.error(ctx, error);
                                }
                            },
                            move |ctx| {
                                let decided = winner_complete.compare_exchange(0, $id, Ordering::SeqCst, Ordering::SeqCst);
                                if decided.is_ok() {
                                    other_cancel_complete.cancel();
                                }
                                if winner_complete.load(Ordering::SeqCst) == $id {
                                    down_complete.complete(ctx);
                                }
                            },
                        ),
                    );
                    $own_cancel.attach(sub.clone());
                    sub
                }};
            }

            let left_sub = wire!(left, 1u8, left_cancel, right_cancel);
            let right_sub = wire!(other, 2u8, right_cancel, left_cancel);

            Some(Box::new(move || {
                left_sub.unsubscribe();
                right_sub.unsubscribe();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Alias for [`race`](Self::race).
    pub fn race_with(&self, other: Observable<A>) -> Observable<A> {
        self.race(other)
    }

    /// Emits `values` up front, then subscribes to `self` and forwards it.
    pub fn start_with(&self, values: Vec<A>) -> Observable<A>
    where
        A: Clone,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            for value in values.clone() {
                if downstream.is_closed() {
                    return None;
                }
                downstream.next(ctx.clone(), value);
            }
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

    /// Forwards `self`, then emits `values` once `self` completes.
    pub fn end_with(&self, values: Vec<A>) -> Observable<A>
    where
        A: Clone,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let values = values.clone();
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| down.next(ctx, value),
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| {
                        for value in values.clone() {
                            if down_complete.is_closed() {
                                return;
                            }
                            down_complete.next(ctx.clone(), value);
                        }
                        down_complete.complete(ctx);
                    },
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Emits `(previous, current)` for each consecutive pair; the first
    /// value alone produces no output.
    pub fn pairwise(&self) -> Observable<(A, A)>
    where
        A: Clone,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<(A, A)>| {
            let previous: Arc<Mutex<Option<A>>> = Arc::new(Mutex::new(None));
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value: A| {
                        let prior = previous.lock().replace(value.clone());
                        if let Some(prior) = prior {
                            down.next(ctx, (prior, value));
                        }
                    },
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
    use crate::sources::{empty, from_iter, throw};
    use rivulet_core::RivuletError;

    #[test]
    fn merge_interleaves_both_sources_and_completes_once() {
        let (mut values, error) = collect(&from_iter(vec![1, 2]).merge(from_iter(vec![3, 4])));
        values.sort();
        assert_eq!(values, vec![1, 2, 3, 4]);
        assert!(error.is_none());
    }

    #[test]
    fn merge_propagates_first_error() {
        let (_values, error) = collect(&from_iter(vec![1]).merge(throw(RivuletError::stream_error("boom"))));
        assert!(error.is_some());
    }

    #[test]
    fn merge_map_flattens_projected_observables() {
        let (mut values, _) = collect(&from_iter(vec![1, 2]).merge_map(|v| from_iter(vec![v, v * 10])));
        values.sort();
        assert_eq!(values, vec![1, 2, 10, 20]);
    }

    #[test]
    fn combine_latest_pairs_latest_of_each_side() {
        let (values, _) = collect(&from_iter(vec![1]).combine_latest(from_iter(vec![10, 20])));
        assert!(values.contains(&(1, 10)) || values.contains(&(1, 20)));
    }

    #[test]
    fn zip_pairs_positionally() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3]).zip(from_iter(vec!["a", "b"])));
        assert_eq!(values, vec![(1, "a"), (2, "b")]);
    }

    #[test]
    fn zip_pairs_positionally_when_shorter_side_is_subscribed_first() {
        let (values, _) = collect(&from_iter(vec!["a", "b"]).zip(from_iter(vec![1, 2, 3])));
        assert_eq!(values, vec![("a", 1), ("b", 2)]);
    }

    #[test]
    fn zip_with_is_an_alias_for_zip() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3]).zip_with(from_iter(vec!["a", "b"])));
        assert_eq!(values, vec![(1, "a"), (2, "b")]);
    }

    #[test]
    fn concat_runs_sources_in_sequence() {
        let (values, _) = collect(&from_iter(vec![1, 2]).concat(from_iter(vec![3, 4])));
        assert_eq!(values, vec![1, 2, 3, 4]);
    }

    #[test]
    fn concat_skips_second_source_on_first_error() {
        let (values, error): (Vec<i32>, _) = collect(&throw(RivuletError::stream_error("boom")).concat(from_iter(vec![1])));
        assert!(values.is_empty());
        assert!(error.is_some());
    }

    #[test]
    fn race_forwards_only_the_first_source_to_emit() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3]).race(never_after_subscribe()));
        assert_eq!(values, vec![1, 2, 3]);
    }

    fn never_after_subscribe() -> Observable<i32> {
        crate::sources::never()
    }

    #[test]
    fn start_with_prepends_values() {
        let (values, _) = collect(&from_iter(vec![3, 4]).start_with(vec![1, 2]));
        assert_eq!(values, vec![1, 2, 3, 4]);
    }

    #[test]
    fn end_with_appends_values_on_complete() {
        let (values, _) = collect(&from_iter(vec![1, 2]).end_with(vec![3, 4]));
        assert_eq!(values, vec![1, 2, 3, 4]);
    }

    #[test]
    fn pairwise_emits_consecutive_pairs() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3, 4]).pairwise());
        assert_eq!(values, vec![(1, 2), (2, 3), (3, 4)]);
    }

    #[test]
    fn pairwise_emits_nothing_for_a_single_value() {
        let (values, _): (Vec<(i32, i32)>, _) = collect(&from_iter(vec![1]).pairwise());
        assert!(values.is_empty());
    }

    #[test]
    fn empty_sources_combine_cleanly() {
        let (values, _): (Vec<i32>, _) = collect(&empty().merge(empty()));
        assert!(values.is_empty());
    }
}
