// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Per-event ambient context (§4.7, §8 C8).
//!
//! Every `Notification` carries the `Context` it was produced under.
//! Context propagation is per-event, not per-subscription: operators that
//! buffer across events (`Scan`, `BufferWithCount`, ...) must explicitly
//! decide which context to re-emit under, usually the last `Next`'s.
//!
//! A `Context` is an immutable key/value map plus an optional cancellation
//! token and deadline. Deriving a child (`with_value`, `with_timeout`,
//! `with_deadline`) never mutates the parent; it produces a new, cheaply
//! cloneable handle.

use crate::cancellation_token::CancellationToken;
use crate::task::RivuletTask;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

type Value = Arc<dyn Any + Send + Sync>;

struct ContextData {
    values: HashMap<&'static str, Value>,
    cancellation: Option<CancellationToken>,
    reason: Arc<OnceLock<String>>,
    // Keeps the deadline-watcher thread alive for exactly as long as this
    // context (and its clones) are alive; see `with_deadline`.
    _timer: Option<Arc<RivuletTask>>,
}

/// An immutable, cheaply cloneable ambient context carried by every event.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextData>,
}

impl Context {
    /// A fresh context with no values, no cancellation, and no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self {
            inner: Arc::new(ContextData {
                values: HashMap::new(),
                cancellation: None,
                reason: Arc::new(OnceLock::new()),
                _timer: None,
            }),
        }
    }

    /// Returns a child context with `(key, value)` added, leaving `self`
    /// unchanged. Shadows a prior value under the same key.
    #[must_use]
    pub fn with_value<T: Send + Sync + 'static>(&self, key: &'static str, value: T) -> Self {
        let mut values = self.inner.values.clone();
        values.insert(key, Arc::new(value) as Value);
        Self {
            inner: Arc::new(ContextData {
                values,
                cancellation: self.inner.cancellation.clone(),
                reason: Arc::clone(&self.inner.reason),
                _timer: self.inner._timer.clone(),
            }),
        }
    }

    /// Looks up a value previously attached with `with_value`.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.inner.values.get(key)?.clone().downcast::<T>().ok()
    }

    /// Replaces the context entirely with a fresh background context.
    #[must_use]
    pub fn reset() -> Self {
        Self::background()
    }

    /// Returns a child context that transforms `self` with `f`. A thin
    /// wrapper so operators can express "derive the next context" as a
    /// single expression in a pipeline.
    #[must_use]
    pub fn map(self, f: impl FnOnce(Self) -> Self) -> Self {
        f(self)
    }

    /// Returns a child context whose cancellation fires after `duration`,
    /// unless the parent's own cancellation (if any) fires first.
    #[must_use]
    pub fn with_timeout(&self, duration: Duration) -> Self {
        self.with_deadline(Instant::now() + duration)
    }

    /// Returns a child context whose cancellation fires at `deadline`,
    /// unless the parent's own cancellation (if any) fires first.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let token = CancellationToken::new();
        let fire_token = token.clone();
        let reason = Arc::new(OnceLock::new());
        let fire_reason = Arc::clone(&reason);
        let parent = self.inner.cancellation.clone();

        let timer = RivuletTask::spawn(move |worker_token| {
            loop {
                let now = Instant::now();
                if now >= deadline {
                    let _ = fire_reason.set("context deadline exceeded".to_string());
                    fire_token.cancel();
                    return;
                }
                let remaining = deadline - now;
                let poll_window = match &parent {
                    Some(p) if p.is_cancelled() => {
                        let _ = fire_reason.set("parent context cancelled".to_string());
                        fire_token.cancel();
                        return;
                    }
                    Some(_) => remaining.min(Duration::from_millis(20)),
                    None => remaining,
                };
                if worker_token.wait_timeout(poll_window) {
                    return;
                }
            }
        });

        Self {
            inner: Arc::new(ContextData {
                values: self.inner.values.clone(),
                cancellation: Some(token),
                reason,
                _timer: Some(Arc::new(timer)),
            }),
        }
    }

    /// Returns `true` if this context (or the deadline/timeout that
    /// produced it) has already been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Returns the recorded cancellation reason, if the context has been
    /// cancelled and a reason was attached (e.g. by `with_deadline`).
    #[must_use]
    pub fn cancellation_reason(&self) -> Option<String> {
        if self.is_cancelled() {
            self.inner.reason.get().cloned()
        } else {
            None
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn background_has_no_values_and_is_not_cancelled() {
        let ctx = Context::background();
        assert!(!ctx.is_cancelled());
        assert!(ctx.get::<i32>("missing").is_none());
    }

    #[test]
    fn with_value_round_trips_and_does_not_mutate_parent() {
        let parent = Context::background();
        let child = parent.with_value("user-id", 42i32);
        assert_eq!(*child.get::<i32>("user-id").unwrap(), 42);
        assert!(parent.get::<i32>("user-id").is_none());
    }

    #[test]
    fn with_value_shadows_same_key() {
        let ctx = Context::background().with_value("k", 1i32).with_value("k", 2i32);
        assert_eq!(*ctx.get::<i32>("k").unwrap(), 2);
    }

    #[test]
    fn with_timeout_cancels_after_duration() {
        let ctx = Context::background().with_timeout(Duration::from_millis(20));
        assert!(!ctx.is_cancelled());
        std::thread::sleep(Duration::from_millis(80));
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.cancellation_reason().as_deref(), Some("context deadline exceeded"));
    }

    #[test]
    fn reset_produces_fresh_background_context() {
        let ctx = Context::background().with_value("k", 1i32).with_timeout(Duration::from_secs(60));
        let fresh = Context::reset();
        assert!(fresh.get::<i32>("k").is_none());
        assert!(!fresh.is_cancelled());
        drop(ctx);
    }
}
