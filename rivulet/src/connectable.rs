// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Deferred-connect multicasting.
//!
//! A [`Connectable`] wraps a cold source observable and a chosen subject
//! kind. Subscribing to [`Connectable::observable`] attaches to the subject
//! without starting the source; [`Connectable::connect`] is what actually
//! subscribes the subject to the source, fanning its events out to every
//! subscriber attached so far (and any that attach later, per the chosen
//! subject's own replay semantics). Disconnecting (unsubscribing the handle
//! `connect` returns) optionally resets the subject for the next connect
//! cycle via [`ConnectableConfig::reset_on_disconnect`].

use crate::observable::Observable;
use crate::subject::{AsyncSubject, BehaviorSubject, PublishSubject, ReplaySubject};
use crate::subscriber::Subscriber;
use crate::subscription::Subscription;
use parking_lot::Mutex;
use rivulet_core::{Context, Observer, RivuletError};
use std::sync::Arc;

/// The subject kind a [`Connectable`] multiplexes its source through, plus
/// whether the subject is replaced on disconnect.
///
/// `Unicast` is deliberately not offered here — it accepts only one
/// subscriber, which defeats the point of a shared connectable.
pub enum ConnectableConfig<T> {
    /// Multiplex via a [`PublishSubject`]: no replay for late subscribers.
    Publish,
    /// Multiplex via a [`BehaviorSubject`] seeded with `initial`.
    Behavior(T),
    /// Multiplex via a [`ReplaySubject`] retaining the last `capacity`
    /// values.
    Replay(usize),
    /// Multiplex via an [`AsyncSubject`]: only the last value, on complete.
    Async,
}

impl<T: Clone> Clone for ConnectableConfig<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Publish => Self::Publish,
            Self::Behavior(initial) => Self::Behavior(initial.clone()),
            Self::Replay(capacity) => Self::Replay(*capacity),
            Self::Async => Self::Async,
        }
    }
}

/// Type-erased fan-out side of whichever subject a [`Connectable`] was
/// configured with, so `Connectable` doesn't need to be generic over the
/// concrete subject type.
trait MulticastSubject<T>: Send + Sync {
    fn observable(&self) -> Observable<T>;
    fn next(&self, ctx: Context, value: T);
    fn error(&self, ctx: Context, error: RivuletError);
    fn complete(&self, ctx: Context);
}

impl<T: Clone + Send + 'static> MulticastSubject<T> for PublishSubject<T> {
    fn observable(&self) -> Observable<T> {
        PublishSubject::observable(self)
    }
    fn next(&self, ctx: Context, value: T) {
        PublishSubject::next(self, ctx, value);
    }
    fn error(&self, ctx: Context, error: RivuletError) {
        PublishSubject::error(self, ctx, error);
    }
    fn complete(&self, ctx: Context) {
        PublishSubject::complete(self, ctx);
    }
}

impl<T: Clone + Send + 'static> MulticastSubject<T> for BehaviorSubject<T> {
    fn observable(&self) -> Observable<T> {
        BehaviorSubject::observable(self)
    }
    fn next(&self, ctx: Context, value: T) {
        BehaviorSubject::next(self, ctx, value);
    }
    fn error(&self, ctx: Context, error: RivuletError) {
        BehaviorSubject::error(self, ctx, error);
    }
    fn complete(&self, ctx: Context) {
        BehaviorSubject::complete(self, ctx);
    }
}

impl<T: Clone + Send + 'static> MulticastSubject<T> for ReplaySubject<T> {
    fn observable(&self) -> Observable<T> {
        ReplaySubject::observable(self)
    }
    fn next(&self, ctx: Context, value: T) {
        ReplaySubject::next(self, ctx, value);
    }
    fn error(&self, ctx: Context, error: RivuletError) {
        ReplaySubject::error(self, ctx, error);
    }
    fn complete(&self, ctx: Context) {
        ReplaySubject::complete(self, ctx);
    }
}

impl<T: Clone + Send + 'static> MulticastSubject<T> for AsyncSubject<T> {
    fn observable(&self) -> Observable<T> {
        AsyncSubject::observable(self)
    }
    fn next(&self, ctx: Context, value: T) {
        AsyncSubject::next(self, ctx, value);
    }
    fn error(&self, ctx: Context, error: RivuletError) {
        AsyncSubject::error(self, ctx, error);
    }
    fn complete(&self, ctx: Context) {
        AsyncSubject::complete(self, ctx);
    }
}

fn build_subject<T: Clone + Send + 'static>(config: &ConnectableConfig<T>) -> Arc<dyn MulticastSubject<T>> {
    match config {
        ConnectableConfig::Publish => Arc::new(PublishSubject::new()),
        ConnectableConfig::Behavior(initial) => Arc::new(BehaviorSubject::new(initial.clone())),
        ConnectableConfig::Replay(capacity) => Arc::new(ReplaySubject::new(*capacity)),
        ConnectableConfig::Async => Arc::new(AsyncSubject::new()),
    }
}

/// Adapts a [`MulticastSubject`] to the [`Observer`] contract, so it can be
/// handed to `source.subscribe(...)` in [`Connectable::connect`].
struct SubjectObserver<T> {
    subject: Arc<dyn MulticastSubject<T>>,
}

impl<T: Send + 'static> Observer<T> for SubjectObserver<T> {
    fn on_next(&mut self, ctx: Context, value: T) {
        self.subject.next(ctx, value);
    }
    fn on_error(&mut self, ctx: Context, error: RivuletError) {
        self.subject.error(ctx, error);
    }
    fn on_complete(&mut self, ctx: Context) {
        self.subject.complete(ctx);
    }
}

/// An observable that buffers subscriptions and starts running only once
/// [`Connectable::connect`] is called.
pub struct Connectable<T> {
    source: Observable<T>,
    config: ConnectableConfig<T>,
    reset_on_disconnect: bool,
    current: Arc<Mutex<Arc<dyn MulticastSubject<T>>>>,
}

impl<T: Clone + Send + 'static> Connectable<T> {
    /// Builds a connectable over `source`, multiplexed through a subject of
    /// the given `config` kind. When `reset_on_disconnect` is set, the
    /// subject is replaced with a fresh one (reseeded from `config`, for
    /// `Behavior`) the moment the `connect()` handle is unsubscribed, so the
    /// next `connect()` starts clean instead of replaying the previous run.
    #[must_use]
    pub fn new(source: Observable<T>, config: ConnectableConfig<T>, reset_on_disconnect: bool) -> Self {
        let current = build_subject(&config);
        Self {
            source,
            config,
            reset_on_disconnect,
            current: Arc::new(Mutex::new(current)),
        }
    }

    /// The multicast `Observable` side: subscribing attaches to whichever
    /// subject is current at subscribe time, without starting the source.
    #[must_use]
    pub fn observable(&self) -> Observable<T> {
        let current = Arc::clone(&self.current);
        Observable::new(move |ctx, subscriber: Subscriber<T>| {
            let subject = current.lock().clone();
            subject.observable().run(ctx, subscriber);
            None
        })
    }

    /// Subscribes the current subject to the source, starting production.
    /// Returns a handle whose unsubscribe disconnects the source from the
    /// subject (and, if configured, resets the subject for the next
    /// `connect()` cycle).
    pub fn connect(&self) -> Subscription {
        let subject = self.current.lock().clone();
        let connect_subscription = self.source.subscribe(SubjectObserver { subject });

        if self.reset_on_disconnect {
            let current = Arc::clone(&self.current);
            let fresh = build_subject(&self.config);
            connect_subscription.add(move || {
                *current.lock() = fresh;
            });
        }

        connect_subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::from_iter;
    use parking_lot::Mutex as StdMutex;
    use std::sync::Arc as StdArc;

    #[test]
    fn subscriptions_before_connect_see_nothing_until_connect_runs() {
        let connectable = Connectable::new(from_iter(vec![1, 2, 3]), ConnectableConfig::Publish, false);
        let received = StdArc::new(StdMutex::new(Vec::new()));
        let recv = StdArc::clone(&received);
        let _sub = connectable.observable().subscribe(rivulet_core::FnObserver::new(
            move |_ctx, v| recv.lock().push(v),
            |_, _| {},
            |_| {},
        ));
        assert!(received.lock().is_empty());

        connectable.connect();
        assert_eq!(*received.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn reset_on_disconnect_replaces_the_subject() {
        let connectable = Connectable::new(from_iter(vec![1]), ConnectableConfig::Publish, true);
        let first_connect = connectable.connect();
        first_connect.unsubscribe();

        // After reset, a subscriber attached post-disconnect should attach
        // to a fresh subject untouched by the first run.
        let received = StdArc::new(StdMutex::new(Vec::new()));
        let recv = StdArc::clone(&received);
        let _sub = connectable.observable().subscribe(rivulet_core::FnObserver::new(
            move |_ctx, v| recv.lock().push(v),
            |_, _| {},
            |_| {},
        ));
        connectable.connect();
        assert_eq!(*received.lock(), vec![1]);
    }

    #[test]
    fn behavior_backed_connectable_replays_seed_to_subscribers_before_connect() {
        let connectable = Connectable::new(from_iter(vec![5]), ConnectableConfig::Behavior(0), false);
        let received = StdArc::new(StdMutex::new(Vec::new()));
        let recv = StdArc::clone(&received);
        let _sub = connectable.observable().subscribe(rivulet_core::FnObserver::new(
            move |_ctx, v| recv.lock().push(v),
            |_, _| {},
            |_| {},
        ));
        assert_eq!(*received.lock(), vec![0]);
    }
}
