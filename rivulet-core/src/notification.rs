// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The notification envelope (§4.1, component C1).
//!
//! A `Notification<T>` is the reified form of the three events an
//! `Observer` can receive. Subjects and replay buffers store notifications
//! directly rather than re-deriving `Next`/`Error`/`Complete` calls;
//! `dispatch` is the one place that turns a stored notification back into
//! an observer call.

use crate::context::Context;
use crate::error::RivuletError;
use crate::observer::Observer;
use std::fmt;

/// A single event in a stream, paired with the context it carries when
/// replayed or buffered.
#[derive(Clone)]
pub enum Notification<T> {
    /// A value notification.
    Next(T),
    /// A terminal error notification.
    Error(RivuletError),
    /// A terminal completion notification, carrying no value.
    Complete,
}

impl<T> Notification<T> {
    /// Returns `true` if this is a `Next` notification.
    #[must_use]
    pub const fn is_next(&self) -> bool {
        matches!(self, Self::Next(_))
    }

    /// Returns `true` if this notification is terminal (`Error` or
    /// `Complete`).
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !self.is_next()
    }

    /// Replays this notification on `observer` under `ctx`, calling
    /// whichever of `on_next`/`on_error`/`on_complete` matches.
    pub fn dispatch(self, ctx: Context, observer: &mut impl Observer<T>) {
        match self {
            Self::Next(value) => observer.on_next(ctx, value),
            Self::Error(error) => observer.on_error(ctx, error),
            Self::Complete => observer.on_complete(ctx),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Notification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next(value) => f.debug_tuple("Next").field(value).finish(),
            Self::Error(error) => f.debug_tuple("Error").field(error).finish(),
            Self::Complete => write!(f, "Complete"),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Notification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next(value) => write!(f, "Next({value})"),
            Self::Error(error) => write!(f, "Error({error})"),
            Self::Complete => write!(f, "Complete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::FnObserver;

    #[test]
    fn is_next_and_is_terminal_agree() {
        assert!(Notification::<i32>::Next(1).is_next());
        assert!(!Notification::<i32>::Next(1).is_terminal());
        assert!(Notification::<i32>::Complete.is_terminal());
        let err: Notification<i32> = Notification::Error(RivuletError::stream_error("boom"));
        assert!(err.is_terminal());
    }

    #[test]
    fn dispatch_routes_to_matching_handler() {
        let mut seen_next = None;
        let mut seen_error = None;
        let mut completed = false;
        let mut observer = FnObserver::new(
            |_ctx, value| seen_next = Some(value),
            |_ctx, error| seen_error = Some(error),
            |_ctx| completed = true,
        );

        Notification::Next(7).dispatch(Context::background(), &mut observer);
        assert_eq!(seen_next, Some(7));

        Notification::Error(RivuletError::stream_error("x")).dispatch(Context::background(), &mut observer);
        assert!(seen_error.is_some());

        Notification::Complete.dispatch(Context::background(), &mut observer);
        assert!(completed);
    }

    #[test]
    fn display_formats_each_variant() {
        assert_eq!(Notification::Next(1).to_string(), "Next(1)");
        assert_eq!(Notification::<i32>::Complete.to_string(), "Complete");
        assert!(Notification::<i32>::Error(RivuletError::stream_error("boom")).to_string().starts_with("Error("));
    }
}
