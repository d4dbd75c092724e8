// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Demo and recording observers named alongside `Collect`/
//! `CollectWithContext` in the external interface: `PrintObserver`,
//! `NoopObserver`, and a [`RecordingObserver`] that captures every event it
//! sees for later assertions.

use parking_lot::Mutex;
use rivulet_core::{Context, Notification, Observer, RivuletError};
use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

/// Prints every event to stdout as it arrives; a demo sink, not meant for
/// production logging (that's what the `tracing`-backed hooks are for).
pub struct PrintObserver<T> {
    label: &'static str,
    _marker: PhantomData<fn(T)>,
}

impl<T> PrintObserver<T> {
    /// Builds a print observer that prefixes every line with `label`.
    #[must_use]
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            _marker: PhantomData,
        }
    }
}

impl<T: Debug + Send> Observer<T> for PrintObserver<T> {
    fn on_next(&mut self, _ctx: Context, value: T) {
        println!("[{}] Next({value:?})", self.label);
    }

    fn on_error(&mut self, _ctx: Context, error: RivuletError) {
        println!("[{}] Error({error})", self.label);
    }

    fn on_complete(&mut self, _ctx: Context) {
        println!("[{}] Complete", self.label);
    }
}

/// An observer that discards every event; useful when a test or example
/// only cares about side effects upstream (e.g. that a source runs to
/// completion) and not about the values themselves.
pub struct NoopObserver<T> {
    _marker: PhantomData<fn(T)>,
}

impl<T> NoopObserver<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for NoopObserver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Observer<T> for NoopObserver<T> {
    fn on_next(&mut self, _ctx: Context, _value: T) {}
    fn on_error(&mut self, _ctx: Context, _error: RivuletError) {}
    fn on_complete(&mut self, _ctx: Context) {}
}

/// A shared log of every event a [`RecordingObserver`] has seen, queryable
/// after the subscription it's attached to has run.
#[derive(Clone)]
pub struct Recording<T> {
    events: Arc<Mutex<Vec<Notification<T>>>>,
}

impl<T: Clone> Recording<T> {
    /// Every notification observed so far, in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<Notification<T>> {
        self.events.lock().clone()
    }

    /// Just the `Next` values observed so far, in arrival order.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                Notification::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }
}

impl<T> Recording<T> {
    /// `true` once an `Error` or `Complete` notification has been seen.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.events.lock().iter().any(Notification::is_terminal)
    }
}

/// An observer that records every event into a [`Recording`] handle kept
/// by the test, instead of forwarding to closures the way [`FnObserver`]
/// does — useful when a test wants to inspect the full event log rather
/// than just the final values.
///
/// [`FnObserver`]: rivulet_core::FnObserver
pub struct RecordingObserver<T> {
    events: Arc<Mutex<Vec<Notification<T>>>>,
}

impl<T: Send + 'static> RecordingObserver<T> {
    /// Builds a recording observer paired with the [`Recording`] handle a
    /// test keeps to inspect what was observed.
    #[must_use]
    pub fn new() -> (Self, Recording<T>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                events: Arc::clone(&events),
            },
            Recording { events },
        )
    }
}

impl<T: Send + 'static> Observer<T> for RecordingObserver<T> {
    fn on_next(&mut self, _ctx: Context, value: T) {
        self.events.lock().push(Notification::Next(value));
    }

    fn on_error(&mut self, _ctx: Context, error: RivuletError) {
        self.events.lock().push(Notification::Error(error));
    }

    fn on_complete(&mut self, _ctx: Context) {
        self.events.lock().push(Notification::Complete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivulet::sources::from_iter;

    #[test]
    fn recording_observer_captures_values_and_completion() {
        let (observer, recording) = RecordingObserver::new();
        from_iter(vec![1, 2, 3]).subscribe(observer);
        assert_eq!(recording.values(), vec![1, 2, 3]);
        assert!(recording.is_terminated());
    }

    #[test]
    fn noop_observer_does_not_panic_on_any_event() {
        from_iter(vec![1, 2, 3]).subscribe(NoopObserver::new());
    }
}
