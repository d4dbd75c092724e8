// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The subject family: five multicast variants that are simultaneously
//! an [`Observable`] and an observer.
//!
//! All five share: a monotonically increasing subscriber index, a
//! thread-safe collection of attached subscribers, and a terminal-state
//! record (`Active` / `Errored` / `Completed`). On subscribe, a subject
//! checks its own terminal state before attaching — an `Errored` subject
//! immediately delivers `Error`, a `Completed` one immediately delivers
//! `Complete` (preceded by a replay for [`ReplaySubject`]/[`UnicastSubject`]).
//! Delivery to attached subscribers happens outside the subject's own lock,
//! using a snapshot of the subscriber list, to avoid a subscriber's own
//! callback re-entering the subject and deadlocking.

use crate::observable::Observable;
use crate::subscriber::Subscriber;
use parking_lot::Mutex;
use rivulet_core::{Context, RivuletError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone)]
enum Terminal {
    Active,
    Errored(RivuletError),
    Completed,
}

struct Entries<T> {
    next_id: AtomicU64,
    list: Mutex<Vec<(u64, Subscriber<T>)>>,
}

impl<T: Send + 'static> Entries<T> {
    fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            list: Mutex::new(Vec::new()),
        }
    }

    /// Attaches `subscriber` and registers its own removal as a finalizer
    /// on its subscription, so a subscriber unsubscribing takes itself out
    /// of the fan-out list without the subject polling for liveness.
    fn attach(self: &Arc<Self>, subscriber: Subscriber<T>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.list.lock().push((id, subscriber.clone()));
        let entries = Arc::clone(self);
        subscriber.add(move || entries.detach(id));
        id
    }

    fn detach(&self, id: u64) {
        self.list.lock().retain(|(entry_id, _)| *entry_id != id);
    }

    fn snapshot(&self) -> Vec<Subscriber<T>> {
        self.list.lock().iter().map(|(_, s)| s.clone()).collect()
    }
}

/// Delivers `f` to every currently-attached subscriber, outside any lock.
fn fan_out<T>(entries: &Entries<T>, f: impl Fn(&Subscriber<T>))
where
    T: Send + 'static,
{
    for subscriber in entries.snapshot() {
        f(&subscriber);
    }
}

/// A hot multicast with no retention: subscribers see only events emitted
/// from their subscribe time onward.
#[derive(Clone)]
pub struct PublishSubject<T> {
    entries: Arc<Entries<T>>,
    terminal: Arc<Mutex<Terminal>>,
}

impl<T: Clone + Send + 'static> PublishSubject<T> {
    /// Creates an empty, active publish subject.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Entries::new()),
            terminal: Arc::new(Mutex::new(Terminal::Active)),
        }
    }

    /// The `Observable` side of this subject: subscribing attaches to the
    /// live fan-out (or immediately replays the terminal state, if any).
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        let entries = Arc::clone(&self.entries);
        let terminal = Arc::clone(&self.terminal);
        Observable::new(move |ctx, subscriber| {
            let state = terminal.lock().clone();
            match state {
                Terminal::Errored(e) => subscriber.error(ctx, e),
                Terminal::Completed => subscriber.complete(ctx),
                Terminal::Active => {
                    entries.attach(subscriber);
                }
            }
            None
        })
    }

    /// Emits `value` to every currently-attached subscriber. A no-op once
    /// terminated.
    pub fn next(&self, ctx: Context, value: T) {
        if !matches!(&*self.terminal.lock(), Terminal::Active) {
            return;
        }
        fan_out(&self.entries, |s| s.next(ctx.clone(), value.clone()));
    }

    /// Terminates the subject with `error`, delivered to every attached
    /// subscriber. Idempotent.
    pub fn error(&self, ctx: Context, error: RivuletError) {
        let mut terminal = self.terminal.lock();
        if !matches!(&*terminal, Terminal::Active) {
            return;
        }
        *terminal = Terminal::Errored(error.clone());
        drop(terminal);
        fan_out(&self.entries, |s| s.error(ctx.clone(), error.clone()));
    }

    /// Completes the subject, delivered to every attached subscriber.
    /// Idempotent.
    pub fn complete(&self, ctx: Context) {
        let mut terminal = self.terminal.lock();
        if !matches!(&*terminal, Terminal::Active) {
            return;
        }
        *terminal = Terminal::Completed;
        drop(terminal);
        fan_out(&self.entries, |s| s.complete(ctx.clone()));
    }
}

impl<T: Clone + Send + 'static> Default for PublishSubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A hot multicast that always holds a "current" value and replays it (or
/// the initial value) to every new subscriber while active. A subscriber
/// attaching after termination sees only the terminal event, not a stale
/// value — a third subscriber after `Complete` sees `Complete` only.
#[derive(Clone)]
pub struct BehaviorSubject<T> {
    entries: Arc<Entries<T>>,
    terminal: Arc<Mutex<Terminal>>,
    current: Arc<Mutex<T>>,
}

impl<T: Clone + Send + 'static> BehaviorSubject<T> {
    /// Creates an active behavior subject seeded with `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            entries: Arc::new(Entries::new()),
            terminal: Arc::new(Mutex::new(Terminal::Active)),
            current: Arc::new(Mutex::new(initial)),
        }
    }

    /// The current value, as last observed by `next` (or the seed).
    #[must_use]
    pub fn value(&self) -> T {
        self.current.lock().clone()
    }

    /// The `Observable` side: replays the current value to new subscribers
    /// while active; delivers only the terminal event once terminated.
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        let entries = Arc::clone(&self.entries);
        let terminal = Arc::clone(&self.terminal);
        let current = Arc::clone(&self.current);
        Observable::new(move |ctx, subscriber| {
            let state = terminal.lock().clone();
            match state {
                Terminal::Errored(e) => subscriber.error(ctx, e),
                Terminal::Completed => subscriber.complete(ctx),
                Terminal::Active => {
                    let value = current.lock().clone();
                    subscriber.next(ctx, value);
                    entries.attach(subscriber);
                }
            }
            None
        })
    }

    /// Updates the current value and emits it to every attached subscriber.
    pub fn next(&self, ctx: Context, value: T) {
        if !matches!(&*self.terminal.lock(), Terminal::Active) {
            return;
        }
        *self.current.lock() = value.clone();
        fan_out(&self.entries, |s| s.next(ctx.clone(), value.clone()));
    }

    /// Terminates the subject with `error`. Idempotent.
    pub fn error(&self, ctx: Context, error: RivuletError) {
        let mut terminal = self.terminal.lock();
        if !matches!(&*terminal, Terminal::Active) {
            return;
        }
        *terminal = Terminal::Errored(error.clone());
        drop(terminal);
        fan_out(&self.entries, |s| s.error(ctx.clone(), error.clone()));
    }

    /// Completes the subject. Idempotent.
    pub fn complete(&self, ctx: Context) {
        let mut terminal = self.terminal.lock();
        if !matches!(&*terminal, Terminal::Active) {
            return;
        }
        *terminal = Terminal::Completed;
        drop(terminal);
        fan_out(&self.entries, |s| s.complete(ctx.clone()));
    }
}

/// A hot multicast that buffers up to the last `N` values and replays them
/// to every new subscriber. On `Complete`, new subscribers still get the
/// full replay, followed by `Complete`.
#[derive(Clone)]
pub struct ReplaySubject<T> {
    entries: Arc<Entries<T>>,
    terminal: Arc<Mutex<Terminal>>,
    buffer: Arc<Mutex<VecDeque<T>>>,
    capacity: usize,
}

impl<T: Clone + Send + 'static> ReplaySubject<T> {
    /// Creates an active replay subject retaining at most `capacity` values.
    ///
    /// # Panics
    /// Panics if `capacity` is zero — a library error raised at
    /// construction time, not delivered through the stream.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ReplaySubject capacity must be greater than zero");
        Self {
            entries: Arc::new(Entries::new()),
            terminal: Arc::new(Mutex::new(Terminal::Active)),
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// The `Observable` side: every new subscriber is replayed the buffered
    /// backlog before being attached to the live fan-out (or, once
    /// terminated, before the terminal event).
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        let entries = Arc::clone(&self.entries);
        let terminal = Arc::clone(&self.terminal);
        let buffer = Arc::clone(&self.buffer);
        Observable::new(move |ctx, subscriber| {
            // Snapshot captured under the lock, released, then replayed —
            // see the module doc for the accepted race with concurrently
            // arriving live events.
            let snapshot: Vec<T> = buffer.lock().iter().cloned().collect();
            let state = terminal.lock().clone();
            for value in snapshot {
                if subscriber.is_closed() {
                    return None;
                }
                subscriber.next(ctx.clone(), value);
            }
            match state {
                Terminal::Errored(e) => subscriber.error(ctx, e),
                Terminal::Completed => subscriber.complete(ctx),
                Terminal::Active => entries.attach(subscriber),
            }
            None
        })
    }

    /// Appends `value` to the replay buffer (dropping the oldest entry if
    /// at capacity) and emits it to every attached subscriber.
    pub fn next(&self, ctx: Context, value: T) {
        if !matches!(&*self.terminal.lock(), Terminal::Active) {
            return;
        }
        let mut buffer = self.buffer.lock();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(value.clone());
        drop(buffer);
        fan_out(&self.entries, |s| s.next(ctx.clone(), value.clone()));
    }

    /// Terminates the subject with `error`. Idempotent.
    pub fn error(&self, ctx: Context, error: RivuletError) {
        let mut terminal = self.terminal.lock();
        if !matches!(&*terminal, Terminal::Active) {
            return;
        }
        *terminal = Terminal::Errored(error.clone());
        drop(terminal);
        fan_out(&self.entries, |s| s.error(ctx.clone(), error.clone()));
    }

    /// Completes the subject. Idempotent.
    pub fn complete(&self, ctx: Context) {
        let mut terminal = self.terminal.lock();
        if !matches!(&*terminal, Terminal::Active) {
            return;
        }
        *terminal = Terminal::Completed;
        drop(terminal);
        fan_out(&self.entries, |s| s.complete(ctx.clone()));
    }
}

/// A hot multicast that withholds every value until `complete`, at which
/// point it fires only the last `Next` followed by `Complete` to every
/// attached subscriber. Subscribing before completion sees nothing until
/// then.
#[derive(Clone)]
pub struct AsyncSubject<T> {
    entries: Arc<Entries<T>>,
    terminal: Arc<Mutex<Terminal>>,
    last: Arc<Mutex<Option<T>>>,
}

impl<T: Clone + Send + 'static> AsyncSubject<T> {
    /// Creates an empty, active async subject.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Entries::new()),
            terminal: Arc::new(Mutex::new(Terminal::Active)),
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// The `Observable` side: attaches silently while active; once
    /// terminated, immediately replays the last value (if any) followed by
    /// `Complete`, or the terminal `Error`.
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        let entries = Arc::clone(&self.entries);
        let terminal = Arc::clone(&self.terminal);
        let last = Arc::clone(&self.last);
        Observable::new(move |ctx, subscriber| {
            let state = terminal.lock().clone();
            match state {
                Terminal::Errored(e) => subscriber.error(ctx, e),
                Terminal::Completed => {
                    let value = last.lock().clone();
                    if let Some(value) = value {
                        subscriber.next(ctx.clone(), value);
                    }
                    subscriber.complete(ctx);
                }
                Terminal::Active => {
                    entries.attach(subscriber);
                }
            }
            None
        })
    }

    /// Records `value` as the latest seen; delivers nothing until
    /// `complete`.
    pub fn next(&self, _ctx: Context, value: T) {
        if !matches!(&*self.terminal.lock(), Terminal::Active) {
            return;
        }
        *self.last.lock() = Some(value);
    }

    /// Terminates with `error`, delivered (with no preceding value) to
    /// every attached subscriber. Idempotent.
    pub fn error(&self, ctx: Context, error: RivuletError) {
        let mut terminal = self.terminal.lock();
        if !matches!(&*terminal, Terminal::Active) {
            return;
        }
        *terminal = Terminal::Errored(error.clone());
        drop(terminal);
        fan_out(&self.entries, |s| s.error(ctx.clone(), error.clone()));
    }

    /// Completes the subject, firing the last recorded value (if any) then
    /// `Complete` to every attached subscriber. Idempotent.
    pub fn complete(&self, ctx: Context) {
        let mut terminal = self.terminal.lock();
        if !matches!(&*terminal, Terminal::Active) {
            return;
        }
        *terminal = Terminal::Completed;
        drop(terminal);
        let value = self.last.lock().clone();
        fan_out(&self.entries, |s| {
            if let Some(value) = &value {
                s.next(ctx.clone(), value.clone());
            }
            s.complete(ctx.clone());
        });
    }
}

impl<T: Clone + Send + 'static> Default for AsyncSubject<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A subject that tolerates only one concurrent subscriber: before the
/// first subscriber arrives, every value is buffered
/// (dropping the oldest on overflow); the first subscriber gets the full
/// buffer followed by live events; a second *concurrent* subscriber instead
/// receives a "concurrent subscribers" error and nothing else.
#[derive(Clone)]
pub struct UnicastSubject<T> {
    terminal: Arc<Mutex<Terminal>>,
    buffer: Arc<Mutex<VecDeque<T>>>,
    buffer_size: usize,
    subscriber: Arc<Mutex<Option<Subscriber<T>>>>,
}

impl<T: Clone + Send + 'static> UnicastSubject<T> {
    /// Creates an active unicast subject that buffers at most
    /// `buffer_size` pre-subscription values, dropping the oldest on
    /// overflow. Pass `usize::MAX` for an effectively unbounded buffer, at
    /// the caller's own risk of unbounded memory growth — prefer a real
    /// bound in production code.
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        Self {
            terminal: Arc::new(Mutex::new(Terminal::Active)),
            buffer: Arc::new(Mutex::new(VecDeque::new())),
            buffer_size,
            subscriber: Arc::new(Mutex::new(None)),
        }
    }

    /// The `Observable` side. A second subscribe call while the first
    /// subscriber is still attached delivers only a "concurrent
    /// subscribers" error.
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        let terminal = Arc::clone(&self.terminal);
        let buffer = Arc::clone(&self.buffer);
        let slot = Arc::clone(&self.subscriber);
        Observable::new(move |ctx, subscriber| {
            // Reserve the slot (and read the terminal state) under the lock,
            // then release it before delivering anything downstream — a
            // subscriber's own callback re-entering this subject (`next`/
            // `error`/`complete`) must not find this same lock still held.
            let state = {
                let mut slot_guard = slot.lock();
                if slot_guard.is_some() {
                    None
                } else {
                    *slot_guard = Some(subscriber.clone());
                    Some(terminal.lock().clone())
                }
            };
            let state = match state {
                None => {
                    subscriber.error(ctx, RivuletError::stream_error("UnicastSubject already has a subscriber"));
                    return None;
                }
                Some(state) => state,
            };

            let backlog: Vec<T> = buffer.lock().drain(..).collect();
            for value in backlog {
                if subscriber.is_closed() {
                    *slot.lock() = None;
                    return None;
                }
                subscriber.next(ctx.clone(), value);
            }
            match state {
                Terminal::Errored(e) => {
                    *slot.lock() = None;
                    subscriber.error(ctx, e);
                }
                Terminal::Completed => {
                    *slot.lock() = None;
                    subscriber.complete(ctx);
                }
                Terminal::Active => {
                    let slot_for_removal = Arc::clone(&slot);
                    subscriber.add(move || *slot_for_removal.lock() = None);
                }
            }
            None
        })
    }

    /// Emits `value` directly to the attached subscriber, or buffers it
    /// (dropping the oldest on overflow) if no subscriber has attached yet.
    pub fn next(&self, ctx: Context, value: T) {
        if !matches!(&*self.terminal.lock(), Terminal::Active) {
            return;
        }
        let subscriber = self.subscriber.lock().clone();
        match subscriber {
            Some(s) => s.next(ctx, value),
            None => {
                let mut buffer = self.buffer.lock();
                if self.buffer_size != usize::MAX && buffer.len() >= self.buffer_size {
                    buffer.pop_front();
                }
                buffer.push_back(value);
            }
        }
    }

    /// Terminates the subject with `error`, delivered to the attached
    /// subscriber (if any) or replayed to whichever subscriber attaches
    /// next. Idempotent.
    pub fn error(&self, ctx: Context, error: RivuletError) {
        let mut terminal = self.terminal.lock();
        if !matches!(&*terminal, Terminal::Active) {
            return;
        }
        *terminal = Terminal::Errored(error.clone());
        drop(terminal);
        let sub = self.subscriber.lock().clone();
        if let Some(s) = sub {
            s.error(ctx, error);
        }
    }

    /// Completes the subject, delivered to the attached subscriber (if any)
    /// or replayed to whichever subscriber attaches next. Idempotent.
    pub fn complete(&self, ctx: Context) {
        let mut terminal = self.terminal.lock();
        if !matches!(&*terminal, Terminal::Active) {
            return;
        }
        *terminal = Terminal::Completed;
        drop(terminal);
        let sub = self.subscriber.lock().clone();
        if let Some(s) = sub {
            s.complete(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::collect;
    use parking_lot::Mutex as StdMutex;
    use std::sync::Arc as StdArc;

    #[test]
    fn publish_subject_only_sees_events_after_subscribe() {
        let subject = PublishSubject::new();
        let received = StdArc::new(StdMutex::new(Vec::new()));
        subject.next(Context::background(), 1);

        let recv = StdArc::clone(&received);
        let sub = subject.observable().subscribe(rivulet_core::FnObserver::new(
            move |_ctx, v| recv.lock().push(v),
            |_, _| {},
            |_| {},
        ));
        subject.next(Context::background(), 2);
        subject.next(Context::background(), 3);
        sub.unsubscribe();
        assert_eq!(*received.lock(), vec![2, 3]);
    }

    #[test]
    fn behavior_subject_replays_latest_value_to_new_subscribers() {
        let subject = BehaviorSubject::new(42);
        let sub1_values = StdArc::new(StdMutex::new(Vec::new()));
        let v = StdArc::clone(&sub1_values);
        let _sub1 = subject
            .observable()
            .subscribe(rivulet_core::FnObserver::new(move |_ctx, val| v.lock().push(val), |_, _| {}, |_| {}));
        assert_eq!(*sub1_values.lock(), vec![42]);

        subject.next(Context::background(), 123);
        assert_eq!(*sub1_values.lock(), vec![42, 123]);

        let sub2_values = StdArc::new(StdMutex::new(Vec::new()));
        let v2 = StdArc::clone(&sub2_values);
        let _sub2 = subject
            .observable()
            .subscribe(rivulet_core::FnObserver::new(move |_ctx, val| v2.lock().push(val), |_, _| {}, |_| {}));
        assert_eq!(*sub2_values.lock(), vec![123]);

        subject.next(Context::background(), 456);
        assert_eq!(*sub1_values.lock(), vec![42, 123, 456]);
        assert_eq!(*sub2_values.lock(), vec![123, 456]);

        subject.complete(Context::background());

        let sub3_values = StdArc::new(StdMutex::new(Vec::new()));
        let sub3_completed = StdArc::new(std::sync::atomic::AtomicBool::new(false));
        let v3 = StdArc::clone(&sub3_values);
        let c3 = StdArc::clone(&sub3_completed);
        let _sub3 = subject.observable().subscribe(rivulet_core::FnObserver::new(
            move |_ctx, val| v3.lock().push(val),
            |_, _| {},
            move |_ctx| c3.store(true, std::sync::atomic::Ordering::SeqCst),
        ));
        assert!(sub3_values.lock().is_empty());
        assert!(sub3_completed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn replay_subject_replays_then_completes_for_late_subscriber() {
        let subject = ReplaySubject::new(2);
        subject.next(Context::background(), 1);
        subject.next(Context::background(), 2);
        subject.next(Context::background(), 3);
        subject.complete(Context::background());

        let (values, error) = collect(&subject.observable());
        assert_eq!(values, vec![2, 3]);
        assert!(error.is_none());
    }

    #[test]
    fn async_subject_fires_only_last_value_then_complete() {
        let subject = AsyncSubject::new();
        let received = StdArc::new(StdMutex::new(Vec::new()));
        let recv = StdArc::clone(&received);
        let observable = subject.observable();
        let _sub = observable.subscribe(rivulet_core::FnObserver::new(move |_ctx, v| recv.lock().push(v), |_, _| {}, |_| {}));

        subject.next(Context::background(), 1);
        subject.next(Context::background(), 2);
        assert!(received.lock().is_empty());

        subject.complete(Context::background());
        assert_eq!(*received.lock(), vec![2]);
    }

    #[test]
    fn unicast_subject_completes_live_subscriber_without_deadlock() {
        let subject: UnicastSubject<i32> = UnicastSubject::new(4);
        let received = StdArc::new(StdMutex::new(Vec::new()));
        let completed = StdArc::new(std::sync::atomic::AtomicBool::new(false));
        let recv = StdArc::clone(&received);
        let comp = StdArc::clone(&completed);
        let observable = subject.observable();
        let _sub = observable.subscribe(rivulet_core::FnObserver::new(
            move |_ctx, v| recv.lock().push(v),
            |_, _| {},
            move |_ctx| comp.store(true, std::sync::atomic::Ordering::SeqCst),
        ));

        subject.next(Context::background(), 1);
        subject.complete(Context::background());

        assert_eq!(*received.lock(), vec![1]);
        assert!(completed.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn unicast_subject_errors_live_subscriber_without_deadlock() {
        let subject: UnicastSubject<i32> = UnicastSubject::new(4);
        let errored = StdArc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = StdArc::clone(&errored);
        let observable = subject.observable();
        let _sub = observable.subscribe(rivulet_core::FnObserver::new(
            |_, _: i32| {},
            move |_, _| flag.store(true, std::sync::atomic::Ordering::SeqCst),
            |_| {},
        ));

        subject.error(Context::background(), RivuletError::stream_error("boom"));
        assert!(errored.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn behavior_subject_tolerates_reentrant_next_from_observer() {
        // A supported feedback pattern: the observer's own `on_next` calls
        // back into the subject it's subscribed to. This must not deadlock
        // on the subject's own `terminal`/`current` locks.
        let subject = BehaviorSubject::new(0);
        let fed_back = StdArc::new(std::sync::atomic::AtomicBool::new(false));
        let received = StdArc::new(StdMutex::new(Vec::new()));
        let recv = StdArc::clone(&received);
        let flag = StdArc::clone(&fed_back);
        let feedback_subject = subject.clone();
        let _sub = subject.observable().subscribe(rivulet_core::FnObserver::new(
            move |_ctx, v| {
                recv.lock().push(v);
                if v == 1 && !flag.swap(true, std::sync::atomic::Ordering::SeqCst) {
                    feedback_subject.next(Context::background(), 2);
                }
            },
            |_, _| {},
            |_| {},
        ));

        subject.next(Context::background(), 1);
        assert_eq!(*received.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn unicast_subject_buffers_then_replays_with_overflow_drop() {
        let subject: UnicastSubject<i32> = UnicastSubject::new(2);
        subject.next(Context::background(), 123);
        subject.next(Context::background(), 456);
        subject.next(Context::background(), 789);
        subject.complete(Context::background());

        let (values, error) = collect(&subject.observable());
        assert_eq!(values, vec![456, 789]);
        assert!(error.is_none());
    }

    #[test]
    fn unicast_subject_rejects_second_concurrent_subscriber() {
        let subject: UnicastSubject<i32> = UnicastSubject::new(4);
        let observable = subject.observable();
        let _first = observable.subscribe(rivulet_core::FnObserver::new(|_, _: i32| {}, |_, _| {}, |_| {}));

        let errored = StdArc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = StdArc::clone(&errored);
        let _second = observable.subscribe(rivulet_core::FnObserver::new(
            |_, _: i32| {},
            move |_, _| flag.store(true, std::sync::atomic::Ordering::SeqCst),
            |_| {},
        ));
        assert!(errored.load(std::sync::atomic::Ordering::SeqCst));
    }
}
