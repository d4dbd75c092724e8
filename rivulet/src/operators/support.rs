// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Shared plumbing for operators that need to cancel their own upstream
//! subscription from inside an observer callback running on that same
//! subscription (`Take`, `TakeWhile`, `TakeUntil`, `ElementAt`, `Race`, ...).
//!
//! `Observable::subscribe_with_context` only returns the `Subscription`
//! *after* the production function has run, but a synchronous source (e.g.
//! `from_iter`) delivers every value — and may reach the operator's cutoff —
//! before that return happens. [`DeferredCancel`] is the fix described in
//! §9 "Cycle avoidance": if the subscription handle isn't available yet
//! when the cutoff is hit, record the request and apply it the moment the
//! handle becomes available.

use crate::subscription::Subscription;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) struct DeferredCancel {
    subscription: Mutex<Option<Subscription>>,
    pending: AtomicBool,
}

impl DeferredCancel {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            subscription: Mutex::new(None),
            pending: AtomicBool::new(false),
        })
    }

    /// Cancels the upstream subscription now, if already known, or flags
    /// the cancellation to apply as soon as [`attach`](Self::attach) runs.
    pub(crate) fn cancel(&self) {
        if let Some(subscription) = self.subscription.lock().clone() {
            subscription.unsubscribe();
        } else {
            self.pending.store(true, Ordering::SeqCst);
        }
    }

    /// Records the real upstream subscription once `subscribe` returns it,
    /// applying any cancellation that was already requested synchronously.
    pub(crate) fn attach(&self, subscription: Subscription) {
        *self.subscription.lock() = Some(subscription.clone());
        if self.pending.load(Ordering::SeqCst) {
            subscription.unsubscribe();
        }
    }
}
