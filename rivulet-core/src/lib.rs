// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Notification, context, and error plumbing shared by the rivulet
//! reactive-streams crates.
//!
//! This crate has no notion of `Observable`/`Subscription`/`Subject` —
//! those live in `rivulet` and are built on top of the types here:
//! [`Notification`], [`Context`], [`Observer`], [`RivuletError`], the
//! detached-worker primitive [`RivuletTask`], and [`CancellationToken`].

pub mod cancellation_token;
pub mod clock;
pub mod context;
pub mod error;
pub mod hooks;
pub mod notification;
pub mod observer;
pub mod task;

pub use cancellation_token::CancellationToken;
pub use clock::{real_clock, Clock, RealClock, SharedClock};
pub use context::Context;
pub use error::{IntoRivuletError, ResultExt, Result, RivuletError};
pub use hooks::{
    report_dropped_notification, report_unhandled_error, set_dropped_notification_hook,
    set_unhandled_error_hook, DroppedNotificationHook, UnhandledErrorHook,
};
pub use notification::Notification;
pub use observer::{FnObserver, Observer};
pub use task::RivuletTask;

/// Convenience re-exports for `use rivulet_core::prelude::*;`.
pub mod prelude {
    pub use crate::{CancellationToken, Context, Notification, Observer, Result, RivuletError};
}
