// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Global diagnostic hooks (§9 design notes: "dropped notification" and
//! "unhandled error" reporting).
//!
//! Two situations in this library have nowhere principled to deliver an
//! error: a notification arriving at a `Subscriber` that has already
//! reached a terminal state (dropped, not an error — §4.2), and a panic
//! caught inside an observer's own `on_error` handler, which cannot be
//! redelivered without looping. Both are reported through a process-wide
//! hook instead of being silently swallowed.
//!
//! The default hooks log through `tracing` when the `tracing` feature is
//! enabled, and do nothing otherwise. Call [`set_dropped_notification_hook`]
//! or [`set_unhandled_error_hook`] once, early in process startup, to
//! install an application-specific hook (a metrics counter, a panic,
//! whatever fits). Installing a hook twice is a programmer error and panics,
//! matching the "configure once at startup" pattern used elsewhere in this
//! crate.

use crate::context::Context;
use crate::error::RivuletError;
use std::sync::OnceLock;

/// Called when a notification arrives at a subscriber that has already
/// terminated. Receives the context the late notification carried and a
/// human-readable description of what arrived (`"Next"`, `"Error"`,
/// `"Complete"`).
pub type DroppedNotificationHook = fn(&Context, &str);

/// Called when a panic is caught inside an observer's `on_error` handler,
/// or another place where a `RivuletError` has nowhere left to flow.
pub type UnhandledErrorHook = fn(&Context, &RivuletError);

static DROPPED_NOTIFICATION_HOOK: OnceLock<DroppedNotificationHook> = OnceLock::new();
static UNHANDLED_ERROR_HOOK: OnceLock<UnhandledErrorHook> = OnceLock::new();

fn default_dropped_notification_hook(_ctx: &Context, kind: &str) {
    #[cfg(feature = "tracing")]
    tracing::warn!(notification = kind, "dropped notification on terminated subscriber");
    #[cfg(not(feature = "tracing"))]
    let _ = kind;
}

fn default_unhandled_error_hook(_ctx: &Context, error: &RivuletError) {
    #[cfg(feature = "tracing")]
    tracing::error!(%error, "unhandled error with no observer to deliver to");
    #[cfg(not(feature = "tracing"))]
    let _ = error;
}

/// Installs the process-wide dropped-notification hook.
///
/// # Panics
/// Panics if called more than once.
pub fn set_dropped_notification_hook(hook: DroppedNotificationHook) {
    DROPPED_NOTIFICATION_HOOK
        .set(hook)
        .unwrap_or_else(|_| panic!("dropped-notification hook already installed"));
}

/// Installs the process-wide unhandled-error hook.
///
/// # Panics
/// Panics if called more than once.
pub fn set_unhandled_error_hook(hook: UnhandledErrorHook) {
    UNHANDLED_ERROR_HOOK
        .set(hook)
        .unwrap_or_else(|_| panic!("unhandled-error hook already installed"));
}

/// Reports a dropped notification through the installed hook, or the
/// default `tracing`-based one if none was installed.
pub fn report_dropped_notification(ctx: &Context, kind: &str) {
    let hook = DROPPED_NOTIFICATION_HOOK.get_or_init(|| default_dropped_notification_hook);
    hook(ctx, kind);
}

/// Reports an unhandled error through the installed hook, or the default
/// `tracing`-based one if none was installed.
pub fn report_unhandled_error(ctx: &Context, error: &RivuletError) {
    let hook = UNHANDLED_ERROR_HOOK.get_or_init(|| default_unhandled_error_hook);
    hook(ctx, error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporting_without_installed_hook_does_not_panic() {
        report_dropped_notification(&Context::background(), "Next");
        report_unhandled_error(&Context::background(), &RivuletError::stream_error("x"));
    }
}
