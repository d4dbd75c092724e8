// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Stateless and lightly-stateful per-element transforms (§4.5.1): `Map`,
//! `MapTo`, `MapErr`, `Scan`, `Cast`, `GroupBy`. `Error` and `Complete` pass
//! through unchanged except where the operator itself is defined to touch
//! them (`MapErr`), or is propagated to every open partition (`GroupBy`).

use crate::observable::Observable;
use crate::subject::PublishSubject;
use parking_lot::Mutex;
use rivulet_core::{Context, FnObserver, RivuletError};
use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// One partition of a [`group_by`](Observable::group_by) split: the key it
/// was grouped on, plus the per-key stream. Grouping uses a
/// [`PublishSubject`] internally — a group observable is hot and
/// unreplayed, so a consumer that doesn't subscribe to a
/// `GroupedObservable` promptly will miss whatever arrived before it did.
pub struct GroupedObservable<K, T> {
    key: K,
    inner: Observable<T>,
}

impl<K: Clone, T> GroupedObservable<K, T> {
    /// The partition key this group was split on.
    #[must_use]
    pub fn key(&self) -> K {
        self.key.clone()
    }

    /// The stream of values belonging to this group.
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        self.inner.clone()
    }
}

impl<A: Send + 'static> Observable<A> {
    /// Applies `f` to every value; errors and completion pass through.
    pub fn map<B, F>(&self, f: F) -> Observable<B>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let f = Arc::new(f);
        Observable::new(move |ctx, downstream| {
            let f = Arc::clone(&f);
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| down.next(ctx, (f)(value)),
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Replaces every value with a fixed constant; errors and completion
    /// pass through.
    pub fn map_to<B>(&self, value: B) -> Observable<B>
    where
        B: Clone + Send + Sync + 'static,
    {
        self.map(move |_| value.clone())
    }

    /// Transforms the error channel only; values and completion pass
    /// through unchanged.
    pub fn map_err<F>(&self, f: F) -> Observable<A>
    where
        F: Fn(RivuletError) -> RivuletError + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let f = Arc::new(f);
        Observable::new(move |ctx, downstream| {
            let f = Arc::clone(&f);
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| down.next(ctx, value),
                    move |ctx, error| down_err.error(ctx, (f)(error)),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Threads an accumulator across values, emitting the running result
    /// instead of the raw value on every `Next`.
    pub fn scan<B, F>(&self, seed: B, f: F) -> Observable<B>
    where
        B: Clone + Send + 'static,
        F: Fn(B, A) -> B + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let f = Arc::new(f);
        let acc = Arc::new(Mutex::new(seed));
        Observable::new(move |ctx, downstream| {
            let f = Arc::clone(&f);
            let acc = Arc::clone(&acc);
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        let next_value = {
                            let mut guard = acc.lock();
                            let updated = f(guard.clone(), value);
                            *guard = updated.clone();
                            updated
                        };
                        down.next(ctx, next_value);
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Attempts a runtime downcast of every value to `B`; a failed
    /// downcast emits a [`RivuletError::CastError`] instead of the value.
    pub fn cast<B>(&self) -> Observable<B>
    where
        A: Any,
        B: Send + 'static,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream| {
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value: A| {
                        let boxed: Box<dyn Any> = Box::new(value);
                        match boxed.downcast::<B>() {
                            Ok(cast) => down.next(ctx, *cast),
                            Err(_) => down.error(ctx, RivuletError::cast_error("value did not match target type")),
                        }
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Partitions values by `key_fn` into per-key [`GroupedObservable`]s: a
    /// new key emits a fresh group downstream (before that key's first
    /// value is pushed into it), repeat keys reuse the existing group.
    /// `Error` and `Complete` are forwarded to every open group as well as
    /// to the outer downstream. The output is itself an `Observable` of
    /// observables and needs a flattening combinator (`merge_all`,
    /// `merge_map`, ...) to collapse back into a single stream of values.
    pub fn group_by<K, F>(&self, key_fn: F) -> Observable<GroupedObservable<K, A>>
    where
        K: Eq + Hash + Clone + Send + 'static,
        A: Clone + Send + 'static,
        F: Fn(&A) -> K + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let key_fn = Arc::new(key_fn);
        Observable::new(move |ctx, downstream| {
            let key_fn = Arc::clone(&key_fn);
            let groups: Arc<Mutex<HashMap<K, PublishSubject<A>>>> = Arc::new(Mutex::new(HashMap::new()));
            let down_next = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let groups_for_next = Arc::clone(&groups);
            let groups_for_err = Arc::clone(&groups);
            let groups_for_complete = groups;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value: A| {
                        let key = key_fn(&value);
                        let existing = groups_for_next.lock().get(&key).cloned();
                        let subject = match existing {
                            Some(subject) => subject,
                            None => {
                                let fresh = PublishSubject::new();
                                let subject = groups_for_next.lock().entry(key.clone()).or_insert_with(|| fresh).clone();
                                down_next.next(
                                    ctx.clone(),
                                    GroupedObservable { key: key.clone(), inner: subject.observable() },
                                );
                                subject
                            }
                        };
                        subject.next(ctx, value);
                    },
                    move |ctx, error| {
                        for subject in groups_for_err.lock().values() {
                            subject.error(ctx.clone(), error.clone());
                        }
                        down_err.error(ctx, error);
                    },
                    move |ctx| {
                        for subject in groups_for_complete.lock().values() {
                            subject.complete(ctx.clone());
                        }
                        down_complete.complete(ctx);
                    },
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
    use crate::sources::from_iter;

    #[test]
    fn map_doubles_each_value() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3]).map(|x| x * 2));
        assert_eq!(values, vec![2, 4, 6]);
    }

    #[test]
    fn map_to_replaces_all_values() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3]).map_to("x"));
        assert_eq!(values, vec!["x", "x", "x"]);
    }

    #[test]
    fn scan_accumulates_running_sum() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3]).scan(0, |acc, x| acc + x));
        assert_eq!(values, vec![1, 3, 6]);
    }

    #[test]
    fn cast_failure_emits_error() {
        let observable: Observable<Box<dyn Any + Send>> =
            from_iter(vec![1i32, 2i32]).map(|v| Box::new(v) as Box<dyn Any + Send>);
        let (values, error): (Vec<i64>, _) = collect(&observable.cast::<i64>());
        assert!(values.is_empty());
        assert!(error.is_some());
    }

    #[test]
    fn group_by_partitions_values_by_key() {
        let grouped = from_iter(vec![1, 2, 3, 4, 5, 6]).group_by(|v| v % 2);
        let flattened = grouped.merge_map(|g| {
            let key = g.key();
            g.observable().map(move |v| (key, v))
        });
        let (mut values, error) = collect(&flattened);
        values.sort();
        assert_eq!(values, vec![(0, 2), (0, 4), (0, 6), (1, 1), (1, 3), (1, 5)]);
        assert!(error.is_none());
    }

    #[test]
    fn group_by_completes_every_open_group() {
        let grouped = from_iter(vec![1, 2, 1, 2]).group_by(|v| *v);
        let flattened = grouped.merge_map(|g| g.observable());
        let (mut values, error) = collect(&flattened);
        values.sort();
        assert_eq!(values, vec![1, 1, 2, 2]);
        assert!(error.is_none());
    }
}
