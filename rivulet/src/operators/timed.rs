// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The timed family (§4.5.4): `Delay`, `Timeout`, `BufferWithTime`,
//! `BufferWithCount`, `BufferWithTimeOrCount`, `SampleTime`, `ThrottleTime`,
//! `TimeInterval`, `Timestamp`.
//!
//! None of these call `std::thread::sleep`/`Instant::now()` directly — every
//! wait goes through an injected [`Clock`], so `rivulet-test-utils`'s
//! virtual clock can drive them deterministically in tests. Each
//! constructor has a `_on` twin taking an explicit [`SharedClock`]; the
//! plain name defaults to [`real_clock`].

use crate::observable::Observable;
use crate::subscriber::Subscriber;
use parking_lot::Mutex;
use rivulet_core::{real_clock, Clock, FnObserver, RivuletError, RivuletTask, SharedClock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

enum DelayedEvent<A> {
    Next(A, Instant),
    Error(RivuletError),
    Complete,
}

impl<A: Send + 'static> Observable<A> {
    /// Shifts every `Next`/`Complete` later by `delay`, preserving arrival
    /// order. `Error` passes straight through, undelayed, so failures are
    /// not hidden behind a timer.
    pub fn delay(&self, delay: Duration) -> Observable<A> {
        self.delay_on(delay, real_clock())
    }

    /// Alias for [`delay`](Self::delay) — the per-item delay, as opposed to
    /// a hypothetical delayed subscription (not offered by this library).
    pub fn delay_each(&self, delay: Duration) -> Observable<A> {
        self.delay(delay)
    }

    /// Like [`delay`](Self::delay), but against an explicit [`Clock`].
    pub fn delay_on(&self, delay: Duration, clock: SharedClock) -> Observable<A> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let (sender, receiver) = async_channel::unbounded::<DelayedEvent<A>>();
            let clock_for_source = SharedClock::clone(&clock);

            let sender_next = sender.clone();
            let sender_err = sender.clone();
            let source_sub = upstream.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |_ctx, value| {
                        let deadline = clock_for_source.now() + delay;
                        let _ = sender_next.send_blocking(DelayedEvent::Next(value, deadline));
                    },
                    move |_ctx, error| {
                        let _ = sender_err.send_blocking(DelayedEvent::Error(error));
                    },
                    move |_ctx| {
                        let _ = sender.send_blocking(DelayedEvent::Complete);
                    },
                ),
            );

            let worker = RivuletTask::spawn(move |cancel| {
                while let Ok(event) = receiver.recv_blocking() {
                    match event {
                        DelayedEvent::Next(value, deadline) => {
                            let remaining = deadline.saturating_duration_since(clock.now());
                            if clock.sleep(remaining, &cancel) || downstream.is_closed() {
                                return;
                            }
                            downstream.next(ctx.clone(), value);
                        }
                        DelayedEvent::Error(error) => {
                            downstream.error(ctx.clone(), error);
                            return;
                        }
                        DelayedEvent::Complete => {
                            downstream.complete(ctx.clone());
                            return;
                        }
                    }
                }
            });

            Some(Box::new(move || {
                source_sub.unsubscribe();
                worker.join();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Errors with [`RivuletError::timeout_error`] if no `Next` arrives
    /// within `duration` of the previous one (or of subscription, for the
    /// first).
    pub fn timeout(&self, duration: Duration) -> Observable<A> {
        self.timeout_on(duration, real_clock())
    }

    /// Like [`timeout`](Self::timeout), but against an explicit [`Clock`].
    pub fn timeout_on(&self, duration: Duration, clock: SharedClock) -> Observable<A> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let deadline: Arc<Mutex<Instant>> = Arc::new(Mutex::new(clock.now() + duration));
            let fired = Arc::new(AtomicBool::new(false));

            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream.clone();
            let deadline_for_next = Arc::clone(&deadline);
            let clock_for_next = SharedClock::clone(&clock);
            let fired_for_events = Arc::clone(&fired);
            let fired_for_error = Arc::clone(&fired);
            let source_sub = upstream.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |ctx, value| {
                        if fired_for_events.load(Ordering::SeqCst) {
                            return;
                        }
                        *deadline_for_next.lock() = clock_for_next.now() + duration;
                        down.next(ctx, value);
                    },
                    move |ctx, error| {
                        if !fired_for_error.swap(true, Ordering::SeqCst) {
                            down_err.error(ctx, error);
                        }
                    },
                    move |ctx| {
                        if !fired.swap(true, Ordering::SeqCst) {
                            down_complete.complete(ctx);
                        }
                    },
                ),
            );

            let down_timeout = downstream;
            let watcher = RivuletTask::spawn(move |cancel| loop {
                let remaining = deadline.lock().saturating_duration_since(clock.now());
                if clock.sleep(remaining, &cancel) {
                    return;
                }
                if down_timeout.is_closed() {
                    return;
                }
                if clock.now() >= *deadline.lock() {
                    down_timeout.error(ctx.clone(), RivuletError::timeout_error("no value within the configured window"));
                    return;
                }
            });

            Some(Box::new(move || {
                source_sub.unsubscribe();
                watcher.join();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Batches values into `Vec`s flushed every `duration`, regardless of
    /// how many (zero or more) arrived in that window.
    pub fn buffer_with_time(&self, duration: Duration) -> Observable<Vec<A>> {
        self.buffer_with_time_on(duration, real_clock())
    }

    /// Like [`buffer_with_time`](Self::buffer_with_time), but against an
    /// explicit [`Clock`].
    pub fn buffer_with_time_on(&self, duration: Duration, clock: SharedClock) -> Observable<Vec<A>> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<Vec<A>>| {
            let buffer: Arc<Mutex<Vec<A>>> = Arc::new(Mutex::new(Vec::new()));
            let buffer_for_next = Arc::clone(&buffer);

            let down_err = downstream.clone();
            let down_complete = downstream.clone();
            let buffer_for_complete = Arc::clone(&buffer);
            let source_sub = upstream.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |_ctx, value| buffer_for_next.lock().push(value),
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| {
                        let flushed = std::mem::take(&mut *buffer_for_complete.lock());
                        if !flushed.is_empty() {
                            down_complete.next(ctx.clone(), flushed);
                        }
                        down_complete.complete(ctx);
                    },
                ),
            );

            let down_tick = downstream;
            let worker = RivuletTask::spawn(move |cancel| loop {
                if clock.sleep(duration, &cancel) || down_tick.is_closed() {
                    return;
                }
                let flushed = std::mem::take(&mut *buffer.lock());
                down_tick.next(ctx.clone(), flushed);
            });

            Some(Box::new(move || {
                source_sub.unsubscribe();
                worker.join();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Batches values into fixed-size `Vec`s of `count` items, flushing a
    /// final partial batch on `Complete`.
    pub fn buffer_with_count(&self, count: usize) -> Observable<Vec<A>> {
        assert!(count > 0, "buffer_with_count requires a non-zero count");
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<Vec<A>>| {
            let buffer: Arc<Mutex<Vec<A>>> = Arc::new(Mutex::new(Vec::with_capacity(count)));
            let buffer_next = Arc::clone(&buffer);
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        let mut buffer = buffer_next.lock();
                        buffer.push(value);
                        if buffer.len() == count {
                            let flushed = std::mem::replace(&mut *buffer, Vec::with_capacity(count));
                            drop(buffer);
                            down.next(ctx, flushed);
                        }
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| {
                        let flushed = std::mem::take(&mut *buffer.lock());
                        if !flushed.is_empty() {
                            down_complete.next(ctx.clone(), flushed);
                        }
                        down_complete.complete(ctx);
                    },
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Flushes whichever comes first: `count` buffered values, or
    /// `duration` elapsed since the last flush. A flush triggered by
    /// `count` does not interrupt the background ticker, so the tick
    /// immediately after an early flush may emit an empty batch — a
    /// documented simplification, not a bug.
    pub fn buffer_with_time_or_count(&self, duration: Duration, count: usize) -> Observable<Vec<A>> {
        self.buffer_with_time_or_count_on(duration, count, real_clock())
    }

    /// Like [`buffer_with_time_or_count`](Self::buffer_with_time_or_count),
    /// but against an explicit [`Clock`].
    pub fn buffer_with_time_or_count_on(&self, duration: Duration, count: usize, clock: SharedClock) -> Observable<Vec<A>> {
        assert!(count > 0, "buffer_with_time_or_count requires a non-zero count");
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<Vec<A>>| {
            let buffer: Arc<Mutex<Vec<A>>> = Arc::new(Mutex::new(Vec::with_capacity(count)));
            let buffer_for_next = Arc::clone(&buffer);
            let buffer_for_complete = Arc::clone(&buffer);
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream.clone();
            let source_sub = upstream.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |ctx, value| {
                        let mut buffer = buffer_for_next.lock();
                        buffer.push(value);
                        if buffer.len() == count {
                            let flushed = std::mem::replace(&mut *buffer, Vec::with_capacity(count));
                            drop(buffer);
                            down.next(ctx, flushed);
                        }
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| {
                        let flushed = std::mem::take(&mut *buffer_for_complete.lock());
                        if !flushed.is_empty() {
                            down_complete.next(ctx.clone(), flushed);
                        }
                        down_complete.complete(ctx);
                    },
                ),
            );

            let down_tick = downstream;
            let worker = RivuletTask::spawn(move |cancel| loop {
                if clock.sleep(duration, &cancel) || down_tick.is_closed() {
                    return;
                }
                let flushed = std::mem::take(&mut *buffer.lock());
                down_tick.next(ctx.clone(), flushed);
            });

            Some(Box::new(move || {
                source_sub.unsubscribe();
                worker.join();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Emits the most recently seen value on every `duration` tick, or
    /// nothing if no new value arrived since the previous tick.
    pub fn sample_time(&self, duration: Duration) -> Observable<A>
    where
        A: Clone,
    {
        self.sample_time_on(duration, real_clock())
    }

    /// Like [`sample_time`](Self::sample_time), but against an explicit
    /// [`Clock`].
    pub fn sample_time_on(&self, duration: Duration, clock: SharedClock) -> Observable<A>
    where
        A: Clone,
    {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let latest: Arc<Mutex<Option<A>>> = Arc::new(Mutex::new(None));
            let latest_for_next = Arc::clone(&latest);

            let down_err = downstream.clone();
            let down_complete = downstream.clone();
            let source_sub = upstream.subscribe_with_context(
                ctx.clone(),
                FnObserver::new(
                    move |_ctx, value| *latest_for_next.lock() = Some(value),
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );

            let down_tick = downstream;
            let worker = RivuletTask::spawn(move |cancel| loop {
                if clock.sleep(duration, &cancel) || down_tick.is_closed() {
                    return;
                }
                if let Some(value) = latest.lock().take() {
                    down_tick.next(ctx.clone(), value);
                }
            });

            Some(Box::new(move || {
                source_sub.unsubscribe();
                worker.join();
            }) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Leading-edge throttle: emits a value immediately, then drops every
    /// value that arrives within `duration` of the last one emitted.
    pub fn throttle_time(&self, duration: Duration) -> Observable<A> {
        self.throttle_time_on(duration, real_clock())
    }

    /// Like [`throttle_time`](Self::throttle_time), but against an explicit
    /// [`Clock`].
    pub fn throttle_time_on(&self, duration: Duration, clock: SharedClock) -> Observable<A> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<A>| {
            let last_emit: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        let now = clock.now();
                        let mut last_emit = last_emit.lock();
                        let should_emit = match *last_emit {
                            Some(last) => now.saturating_duration_since(last) >= duration,
                            None => true,
                        };
                        if should_emit {
                            *last_emit = Some(now);
                            drop(last_emit);
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

    /// Maps each value to `(value, elapsed)`, where `elapsed` is the time
    /// since the previous value (or since subscription, for the first).
    pub fn time_interval(&self) -> Observable<(A, Duration)> {
        self.time_interval_on(real_clock())
    }

    /// Like [`time_interval`](Self::time_interval), but against an
    /// explicit [`Clock`].
    pub fn time_interval_on(&self, clock: SharedClock) -> Observable<(A, Duration)> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<(A, Duration)>| {
            let last: Arc<Mutex<Instant>> = Arc::new(Mutex::new(clock.now()));
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| {
                        let now = clock.now();
                        let elapsed = now.saturating_duration_since(*last.lock());
                        *last.lock() = now;
                        down.next(ctx, (value, elapsed));
                    },
                    move |ctx, error| down_err.error(ctx, error),
                    move |ctx| down_complete.complete(ctx),
                ),
            );
            Some(Box::new(move || sub.unsubscribe()) as Box<dyn FnOnce() + Send>)
        })
    }

    /// Maps each value to `(value, instant)`, the clock's instant at
    /// arrival.
    pub fn timestamp(&self) -> Observable<(A, Instant)> {
        self.timestamp_on(real_clock())
    }

    /// Like [`timestamp`](Self::timestamp), but against an explicit
    /// [`Clock`].
    pub fn timestamp_on(&self, clock: SharedClock) -> Observable<(A, Instant)> {
        let upstream = self.clone();
        Observable::new(move |ctx, downstream: Subscriber<(A, Instant)>| {
            let down = downstream.clone();
            let down_err = downstream.clone();
            let down_complete = downstream;
            let sub = upstream.subscribe_with_context(
                ctx,
                FnObserver::new(
                    move |ctx, value| down.next(ctx, (value, clock.now())),
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
    use crate::sources::from_iter;
    use std::time::Duration;

    #[test]
    fn delay_preserves_order_and_delivers_every_value() {
        let (values, error) = collect(&from_iter(vec![1, 2, 3]).delay(Duration::from_millis(5)));
        assert_eq!(values, vec![1, 2, 3]);
        assert!(error.is_none());
    }

    #[test]
    fn delay_passes_error_through() {
        let (values, error): (Vec<i32>, _) = collect(&crate::sources::throw(RivuletError::stream_error("boom")).delay(Duration::from_millis(5)));
        assert!(values.is_empty());
        assert!(error.is_some());
    }

    #[test]
    fn timeout_fires_when_source_never_emits() {
        let (values, error): (Vec<i32>, _) = collect(&crate::sources::never().timeout(Duration::from_millis(5)));
        assert!(values.is_empty());
        assert!(error.is_some());
    }

    #[test]
    fn timeout_does_not_fire_for_a_fast_source() {
        let (values, error) = collect(&from_iter(vec![1, 2, 3]).timeout(Duration::from_secs(5)));
        assert_eq!(values, vec![1, 2, 3]);
        assert!(error.is_none());
    }

    #[test]
    fn buffer_with_time_flushes_on_complete() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3]).buffer_with_time(Duration::from_secs(5)));
        assert_eq!(values, vec![vec![1, 2, 3]]);
    }

    #[test]
    fn buffer_with_count_batches_fixed_size_chunks() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3, 4, 5]).buffer_with_count(2));
        assert_eq!(values, vec![vec![1, 2], vec![3, 4], vec![5]]);
    }

    #[test]
    fn buffer_with_time_or_count_flushes_on_count() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3, 4]).buffer_with_time_or_count(Duration::from_secs(5), 2));
        assert!(values.contains(&vec![1, 2]));
    }

    #[test]
    fn throttle_time_drops_values_within_the_window() {
        let (values, _) = collect(&from_iter(vec![1, 2, 3]).throttle_time(Duration::from_secs(5)));
        assert_eq!(values, vec![1]);
    }

    #[test]
    fn time_interval_tags_each_value_with_an_elapsed_duration() {
        let (values, _) = collect(&from_iter(vec![1, 2]).time_interval());
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn timestamp_tags_each_value_with_an_instant() {
        let (values, _) = collect(&from_iter(vec![1, 2]).timestamp());
        assert_eq!(values.len(), 2);
        assert!(values[1].1 >= values[0].1);
    }
}
