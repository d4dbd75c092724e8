// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Observable constructors: `from_iter`/`just`, `throw`, `empty`, `never`,
//! `range`, `range_with_interval`, `interval`, `timer`, `defer`, `iif`.
//!
//! Every constructor here is cold: each `subscribe` call re-runs the
//! production function from scratch.

use crate::observable::Observable;
use rivulet_core::{real_clock, Clock, RivuletError, SharedClock};
use std::time::Duration;

/// Emits every item of `items` in order, then completes.
pub fn from_iter<T, I>(items: I) -> Observable<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
{
    Observable::new(move |ctx, subscriber| {
        for item in items.clone() {
            if subscriber.is_closed() {
                return None;
            }
            subscriber.next(ctx.clone(), item);
        }
        if !subscriber.is_closed() {
            subscriber.complete(ctx);
        }
        None
    })
}

/// Emits the given values in order, then completes. A thin convenience
/// over [`from_iter`] for a fixed literal list.
pub fn just<T>(values: Vec<T>) -> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    from_iter(values)
}

/// Immediately errors with `error`, delivering nothing else.
pub fn throw<T>(error: RivuletError) -> Observable<T>
where
    T: Send + 'static,
{
    Observable::new(move |ctx, subscriber| {
        subscriber.error(ctx, error.clone());
        None
    })
}

/// Immediately completes, delivering no values.
pub fn empty<T>() -> Observable<T>
where
    T: Send + 'static,
{
    Observable::new(|ctx, subscriber| {
        subscriber.complete(ctx);
        None
    })
}

/// Never emits, errors, or completes. Subscribing only ever ends via
/// unsubscribe.
pub fn never<T>() -> Observable<T>
where
    T: Send + 'static,
{
    Observable::new(|_ctx, _subscriber| None)
}

/// Emits the integers `[start, start + count)`, then completes.
pub fn range(start: i64, count: u64) -> Observable<i64> {
    from_iter((0..count).map(move |i| start + i as i64))
}

/// Emits `[start, start + count)` spaced `interval` apart, then completes.
/// Uses [`real_clock`] unless `with_clock` is used to inject a test double.
pub fn range_with_interval(start: i64, count: u64, interval: Duration) -> Observable<i64> {
    range_with_interval_on(start, count, interval, real_clock())
}

/// Like [`range_with_interval`], but against an explicit [`Clock`] — the
/// hook `rivulet-test-utils`'s virtual clock attaches through.
pub fn range_with_interval_on(start: i64, count: u64, interval: Duration, clock: SharedClock) -> Observable<i64> {
    Observable::new(move |ctx, subscriber| {
        let clock = SharedClock::clone(&clock);
        let task = rivulet_core::RivuletTask::spawn(move |cancel| {
            for i in 0..count {
                if clock.sleep(interval, &cancel) || subscriber.is_closed() {
                    return;
                }
                subscriber.next(ctx.clone(), start + i as i64);
            }
            if !subscriber.is_closed() {
                subscriber.complete(ctx);
            }
        });
        Some(Box::new(move || task.join()))
    })
}

/// Emits an ever-incrementing counter starting at `0`, spaced `period`
/// apart, forever (until unsubscribed).
pub fn interval(period: Duration) -> Observable<u64> {
    interval_on(period, real_clock())
}

/// Like [`interval`], but against an explicit [`Clock`].
pub fn interval_on(period: Duration, clock: SharedClock) -> Observable<u64> {
    Observable::new(move |ctx, subscriber| {
        let clock = SharedClock::clone(&clock);
        let task = rivulet_core::RivuletTask::spawn(move |cancel| {
            let mut i = 0u64;
            loop {
                if clock.sleep(period, &cancel) || subscriber.is_closed() {
                    return;
                }
                subscriber.next(ctx.clone(), i);
                i += 1;
            }
        });
        Some(Box::new(move || task.join()))
    })
}

/// Emits a single `0` after `delay`, then completes.
pub fn timer(delay: Duration) -> Observable<u64> {
    timer_on(delay, real_clock())
}

/// Like [`timer`], but against an explicit [`Clock`].
pub fn timer_on(delay: Duration, clock: SharedClock) -> Observable<u64> {
    Observable::new(move |ctx, subscriber| {
        let clock = SharedClock::clone(&clock);
        let task = rivulet_core::RivuletTask::spawn(move |cancel| {
            if clock.sleep(delay, &cancel) || subscriber.is_closed() {
                return;
            }
            subscriber.next(ctx.clone(), 0);
            if !subscriber.is_closed() {
                subscriber.complete(ctx);
            }
        });
        Some(Box::new(move || task.join()))
    })
}

/// Defers building the observable until each `subscribe` call, so every
/// subscription sees a freshly constructed source instead of one built
/// eagerly at call time.
pub fn defer<T, F>(factory: F) -> Observable<T>
where
    T: Send + 'static,
    F: Fn() -> Observable<T> + Send + Sync + 'static,
{
    Observable::new(move |ctx, subscriber| {
        let source = factory();
        source.run(ctx, subscriber);
        None
    })
}

/// Chooses between `then_source` and `else_source` by re-evaluating
/// `condition` on every `subscribe`.
pub fn iif<T, C>(condition: C, then_source: Observable<T>, else_source: Observable<T>) -> Observable<T>
where
    T: Send + 'static,
    C: Fn() -> bool + Send + Sync + 'static,
{
    defer(move || if condition() { then_source.clone() } else { else_source.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::collect;
    use std::time::Duration;

    #[test]
    fn from_iter_emits_then_completes() {
        let (values, error) = collect(&from_iter(vec![1, 2, 3]));
        assert_eq!(values, vec![1, 2, 3]);
        assert!(error.is_none());
    }

    #[test]
    fn throw_delivers_only_error() {
        let (values, error): (Vec<i32>, _) = collect(&throw(RivuletError::stream_error("boom")));
        assert!(values.is_empty());
        assert!(error.is_some());
    }

    #[test]
    fn empty_completes_with_no_values() {
        let (values, error): (Vec<i32>, _) = collect(&empty());
        assert!(values.is_empty());
        assert!(error.is_none());
    }

    #[test]
    fn range_produces_contiguous_integers() {
        let (values, _) = collect(&range(5, 3));
        assert_eq!(values, vec![5, 6, 7]);
    }

    #[test]
    fn timer_emits_after_delay() {
        let (values, _) = collect(&timer(Duration::from_millis(10)));
        assert_eq!(values, vec![0]);
    }

    #[test]
    fn defer_reruns_factory_per_subscription() {
        use std::sync::atomic::{AtomicI32, Ordering};
        use std::sync::Arc;
        let calls = Arc::new(AtomicI32::new(0));
        let counter = Arc::clone(&calls);
        let observable = defer(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            from_iter(vec![1])
        });
        collect(&observable);
        collect(&observable);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn iif_picks_branch_by_condition() {
        let observable = iif(|| true, from_iter(vec![1]), from_iter(vec![2]));
        let (values, _) = collect(&observable);
        assert_eq!(values, vec![1]);
    }
}
