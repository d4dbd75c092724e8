// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The observer contract (§4, component C3).
//!
//! An `Observer` is a sink with three entry points, each receiving the
//! ambient [`Context`] the event was produced under. After an observer has
//! received `on_error` or `on_complete`, it must receive nothing else —
//! that invariant is enforced one layer up, by `Subscriber` (§4.2), not by
//! this trait itself.

use crate::context::Context;
use crate::error::RivuletError;

/// A sink that accepts `Next`/`Error`/`Complete` events, each carrying the
/// `Context` it was produced under.
///
/// Implementations take `&mut self` because a single observer is meant to
/// be driven by exactly one producer at a time; `Subscriber` is the layer
/// that arbitrates concurrent access per its configured safety mode
/// (§4.2).
pub trait Observer<T>: Send {
    /// Receives a value notification.
    fn on_next(&mut self, ctx: Context, value: T);

    /// Receives a terminal error. No further calls follow.
    fn on_error(&mut self, ctx: Context, error: RivuletError);

    /// Receives terminal completion. No further calls follow.
    fn on_complete(&mut self, ctx: Context);
}

/// Blanket observer built from three closures, covering the common case of
/// `Subscribe(on_next, on_error, on_complete)` without a custom type.
pub struct FnObserver<Next, Err, Complete> {
    on_next: Next,
    on_error: Option<Err>,
    on_complete: Option<Complete>,
}

impl<Next, Err, Complete> FnObserver<Next, Err, Complete> {
    /// Builds an observer from its three handlers.
    pub fn new(on_next: Next, on_error: Err, on_complete: Complete) -> Self {
        Self {
            on_next,
            on_error: Some(on_error),
            on_complete: Some(on_complete),
        }
    }
}

impl<T, Next, Err, Complete> Observer<T> for FnObserver<Next, Err, Complete>
where
    Next: FnMut(Context, T) + Send,
    Err: FnMut(Context, RivuletError) + Send,
    Complete: FnMut(Context) + Send,
{
    fn on_next(&mut self, ctx: Context, value: T) {
        (self.on_next)(ctx, value);
    }

    fn on_error(&mut self, ctx: Context, error: RivuletError) {
        if let Some(f) = &mut self.on_error {
            f(ctx, error);
        }
    }

    fn on_complete(&mut self, ctx: Context) {
        if let Some(f) = &mut self.on_complete {
            f(ctx);
        }
    }
}
