// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Flattening a higher-order `Observable<Observable<T>>` (§4.5.3's
//! "*All" variants): `MergeAll`, `ConcatAll`, `CombineLatestAll`, `ZipAll`,
//! plus `Flatten` (§4.5.1's name for the same `MergeAll` operation). The
//! pairwise combinators these generalize (`merge`, `concat`,
//! `combine_latest`, `zip`) live in [`super::combining`].

use crate::observable::Observable;
use crate::subscriber::Subscriber;
use crate::subscription::Subscription;
use parking_lot::Mutex;
use rivulet_core::FnObserver;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

impl<T: Send + 'static> Observable<Observable<T>> {
    /// Subscribes to every inner observable as it arrives and forwards all
    /// of their values concurrently — `MergeAll` is [`merge_map`] with the
    /// identity projection.
    ///
    /// [`merge_map`]: crate::observable::Observable::merge_map
    pub fn merge_all(&self) -> Observable<T> {
        self.merge_map(|inner| inner)
    }

    /// Alias for [`merge_all`](Self::merge_all) under the name §4.5.1 lists
    /// alongside `Map`/`Scan`/`GroupBy` — the plain, concurrent flattening
    /// of one level of `Observable<Observable<T>>`.
    pub fn flatten(&self) -> Observable<T> {
        self.merge_all()
    }

    /// Runs inner observables one at a time, in the order the outer
    /// delivers them: an inner observable that arrives while another is
    /// still running is queued, not started concurrently.
    pub fn concat_all(&self) -> Observable<T> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<T>| {
            let state = Arc::new(ConcatAllState {
                queue: Mutex::new(VecDeque::new()),
                running: AtomicBool::new(false),
                outer_done: AtomicBool::new(false),
                errored: AtomicBool::new(false),
                active: Mutex::new(None),
                ctx: ctx.clone(),
                downstream: downstream.clone(),
            });

            let state_for_next = Arc::clone(&state);
            let state_for_err = Arc::clone(&state);
            let state_for_complete = Arc::clone(&state);
            let down_err = downstream.clone();
            let outer_sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |_ctx, inner| {
                        state_for_next.queue.lock().push_back(inner);
                        advance(&state_for_next);
                    },
                    move |ctx, error| {
                        if !state_for_err.errored.swap(true, Ordering::SeqCst) {
                            down_err.error(ctx, error);
                        }
                    },
                    move |_ctx| {
                        state_for_complete.outer_done.store(true, Ordering::SeqCst);
                        advance(&state_for_complete);
                    },
                ),
            );

            Some(Box::new(move || {
                outer_sub.unsubscribe();
                if let Some(active) = state.active.lock().take() {
                    active.unsubscribe();
                }
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Collects every inner observable the outer delivers, and once the
    /// outer completes, emits a `Vec<T>` snapshot whenever any inner
    /// updates — once all inners have emitted at least once. The
    /// collect-then-run sequencing mirrors RxJS's `combineLatestAll`: this
    /// operator needs the full source set before it can combine them, so
    /// it cannot start until the outer is known to be finished.
    pub fn combine_latest_all(&self) -> Observable<Vec<T>>
    where
        T: Clone,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<Vec<T>>| {
            let sources: Arc<Mutex<Vec<Observable<T>>>> = Arc::new(Mutex::new(Vec::new()));
            let sources_for_next = Arc::clone(&sources);
            let down_err = downstream.clone();
            let down_for_run = downstream;
            let ctx_for_run = ctx.clone();
            let outer_sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |_ctx, inner| sources_for_next.lock().push(inner),
                    move |ctx, error| down_err.error(ctx, error),
                    move |_ctx| {
                        let collected = sources.lock().clone();
                        combine_latest_vec(collected).run(ctx_for_run.clone(), down_for_run.clone());
                    },
                ),
            );

            Some(Box::new(move || outer_sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Like [`combine_latest_all`](Self::combine_latest_all), but pairs
    /// values positionally across every collected inner observable instead
    /// of combining their latest values.
    pub fn zip_all(&self) -> Observable<Vec<T>> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<Vec<T>>| {
            let sources: Arc<Mutex<Vec<Observable<T>>>> = Arc::new(Mutex::new(Vec::new()));
            let sources_for_next = Arc::clone(&sources);
            let down_err = downstream.clone();
            let down_for_run = downstream;
            let ctx_for_run = ctx.clone();
            let outer_sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |_ctx, inner| sources_for_next.lock().push(inner),
                    move |ctx, error| down_err.error(ctx, error),
                    move |_ctx| {
                        let collected = sources.lock().clone();
                        zip_vec(collected).run(ctx_for_run.clone(), down_for_run.clone());
                    },
                ),
            );

            Some(Box::new(move || outer_sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }
}

struct ConcatAllState<T> {
    queue: Mutex<VecDeque<Observable<T>>>,
    running: AtomicBool,
    outer_done: AtomicBool,
    errored: AtomicBool,
    active: Mutex<Option<Subscription>>,
    ctx: rivulet_core::Context,
    downstream: Subscriber<T>,
}

/// Claims the "currently driving" slot and starts the next queued inner
/// observable, if any; a no-op if another call is already driving.
fn advance<T: Send + 'static>(state: &Arc<ConcatAllState<T>>) {
    if state.running.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
        return;
    }
    let next = state.queue.lock().pop_front();
    match next {
        Some(inner) => {
            let state_for_complete = Arc::clone(state);
            let state_for_err = Arc::clone(state);
            let down_next = state.downstream.clone();
            let down_err = state.downstream.clone();
            let sub = inner.subscribe_with_context(
                state.ctx.clone(),
                FnObserver::new(
                    move |ctx, value| down_next.next(ctx, value),
                    move |ctx, error| {
                        if !state_for_err.errored.swap(true, Ordering::SeqCst) {
                            down_err.error(ctx, error);
                        }
                    },
                    move |_ctx| {
                        state_for_complete.running.store(false, Ordering::SeqCst);
                        advance(&state_for_complete);
                    },
                ),
            );
            *state.active.lock() = Some(sub);
        }
        None => {
            state.running.store(false, Ordering::SeqCst);
            if state.outer_done.load(Ordering::SeqCst) && !state.errored.load(Ordering::SeqCst) {
                state.downstream.complete(state.ctx.clone());
            }
        }
    }
}

fn combine_latest_vec<T: Clone + Send + 'static>(sources: Vec<Observable<T>>) -> Observable<Vec<T>> {
    let count = sources.len();
    Observable::new(move |ctx, downstream: Subscriber<Vec<T>>| {
        if count == 0 {
            downstream.complete(ctx);
            return None;
        }
        let latest: Arc<Vec<Mutex<Option<T>>>> = Arc::new((0..count).map(|_| Mutex::new(None)).collect());
        let remaining = Arc::new(AtomicUsize::new(count));
        let errored = Arc::new(AtomicBool::new(false));
        let mut subs = Vec::with_capacity(count);
        for (index, source) in sources.into_iter().enumerate() {
            let latest = Arc::clone(&latest);
            let remaining = Arc::clone(&remaining);
            let down_next = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream.clone();
            let errored_err = Arc::clone(&errored);
            let errored_complete = Arc::clone(&errored);
            let sub = source.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |ctx, value: T| {
                        *latest[index].lock() = Some(value);
                        if latest.iter().all(|slot| slot.lock().is_some()) {
                            let snapshot: Vec<T> = latest.iter().map(|slot| slot.lock().clone().unwrap()).collect();
                            down_next.next(ctx, snapshot);
                        }
                    },
                    move |ctx, error| {
                        if !errored_err.swap(true, Ordering::SeqCst) {
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
            subs.push(sub);
        }
        Some(Box::new(move || {
            for sub in subs {
                sub.unsubscribe();
            }
        }) as Box<dyn FnOnce() + Send>)
    })
}

fn zip_vec<T: Send + 'static>(sources: Vec<Observable<T>>) -> Observable<Vec<T>> {
    let count = sources.len();
    Observable::new(move |ctx, downstream: Subscriber<Vec<T>>| {
        if count == 0 {
            downstream.complete(ctx);
            return None;
        }
        let queues: Arc<Vec<Mutex<VecDeque<T>>>> = Arc::new((0..count).map(|_| Mutex::new(VecDeque::new())).collect());
        // Per-index completion flags: an index's own `Complete` only ends
        // the whole zip once that index's queue has drained to empty (it
        // has nothing left to pair with the others' future arrivals) — see
        // the matching fix on the pairwise `zip` above for why completing
        // on the first `Complete` unconditionally is wrong for cold,
        // synchronous sources.
        let source_done: Arc<Vec<AtomicBool>> = Arc::new((0..count).map(|_| AtomicBool::new(false)).collect());
        let terminated = Arc::new(AtomicBool::new(false));
        let mut subs = Vec::with_capacity(count);

        let try_complete = {
            let queues = Arc::clone(&queues);
            let source_done = Arc::clone(&source_done);
            let terminated = Arc::clone(&terminated);
            move |ctx: rivulet_core::Context, downstream: &Subscriber<Vec<T>>| {
                let exhausted = source_done
                    .iter()
                    .enumerate()
                    .any(|(i, done)| done.load(Ordering::SeqCst) && queues[i].lock().is_empty());
                if exhausted && !terminated.swap(true, Ordering::SeqCst) {
                    downstream.complete(ctx);
                }
            }
        };

        for (index, source) in sources.into_iter().enumerate() {
            let queues_for_next = Arc::clone(&queues);
            let terminated_guard = Arc::clone(&terminated);
            let terminated_err = Arc::clone(&terminated);
            let source_done_for_complete = Arc::clone(&source_done);
            let down_next = downstream.clone();
            let down_err = downstream.clone();
            let down_for_next = downstream.clone();
            let down_for_complete = downstream.clone();
            let try_complete_for_next = try_complete.clone();
            let try_complete_for_complete = try_complete.clone();
            let sub = source.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |ctx, value: T| {
                        if terminated_guard.load(Ordering::SeqCst) {
                            return;
                        }
                        queues_for_next[index].lock().push_back(value);
                        if queues_for_next.iter().all(|q| !q.lock().is_empty()) {
                            let tuple: Vec<T> = queues_for_next.iter().map(|q| q.lock().pop_front().unwrap()).collect();
                            down_next.next(ctx.clone(), tuple);
                        }
                        try_complete_for_next(ctx, &down_for_next);
                    },
                    move |ctx, error| {
                        if !terminated_err.swap(true, Ordering::SeqCst) {
                            down_err.error(ctx, error);
                        }
                    },
                    move |ctx| {
                        source_done_for_complete[index].store(true, Ordering::SeqCst);
                        try_complete_for_complete(ctx, &down_for_complete);
                    },
                ),
            );
            subs.push(sub);
        }
        Some(Box::new(move || {
            for sub in subs {
                sub.unsubscribe();
            }
        }) as Box<dyn FnOnce() + Send>)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::collect;
    use crate::sources::from_iter;

    #[test]
    fn merge_all_flattens_concurrently() {
        let outer = from_iter(vec![from_iter(vec![1, 2]), from_iter(vec![3, 4])]);
        let (mut values, _) = collect(&outer.merge_all());
        values.sort();
        assert_eq!(values, vec![1, 2, 3, 4]);
    }

    #[test]
    fn flatten_is_an_alias_for_merge_all() {
        let outer = from_iter(vec![from_iter(vec![1, 2]), from_iter(vec![3, 4])]);
        let (mut values, _) = collect(&outer.flatten());
        values.sort();
        assert_eq!(values, vec![1, 2, 3, 4]);
    }

    #[test]
    fn concat_all_runs_inner_observables_in_order() {
        let outer = from_iter(vec![from_iter(vec![1, 2]), from_iter(vec![3, 4])]);
        let (values, _) = collect(&outer.concat_all());
        assert_eq!(values, vec![1, 2, 3, 4]);
    }

    #[test]
    fn combine_latest_all_combines_every_collected_source() {
        let outer = from_iter(vec![from_iter(vec![1]), from_iter(vec![10, 20])]);
        let (values, _) = collect(&outer.combine_latest_all());
        assert!(!values.is_empty());
        assert!(values.iter().all(|snapshot| snapshot.len() == 2));
    }

    #[test]
    fn zip_all_pairs_positionally_across_every_collected_source() {
        let outer = from_iter(vec![from_iter(vec![1, 2, 3]), from_iter(vec![10, 20])]);
        let (values, _) = collect(&outer.zip_all());
        assert_eq!(values, vec![vec![1, 10], vec![2, 20]]);
    }

    #[test]
    fn concat_all_on_empty_outer_completes_with_no_values() {
        let outer: Observable<Observable<i32>> = from_iter(Vec::new());
        let (values, _) = collect(&outer.concat_all());
        assert!(values.is_empty());
    }
}
