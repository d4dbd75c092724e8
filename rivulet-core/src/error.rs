// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::doc_markdown)]
//! Error types for the rivulet reactive-streams library.
//!
//! This module defines a root [`RivuletError`] with variants for the
//! taxonomy described in §7 of the design: domain/user errors delivered via
//! `Error` notifications, cast failures, timeout errors, and the aggregate
//! raised when a `Subscription`'s finalizers panic. Operator-argument
//! violations (negative counts, zero buffer sizes) are programmer errors
//! and are not represented here — they panic at construction time instead
//! of being delivered through the stream.
//!
//! # Examples
//!
//! ```
//! use rivulet_core::{RivuletError, Result};
//!
//! fn process_data() -> Result<()> {
//!     Err(RivuletError::stream_error("stream not ready"))
//! }
//! ```

/// Root error type for all rivulet operations.
#[derive(Debug, thiserror::Error)]
pub enum RivuletError {
    /// A general error for stream operations that don't fit other categories.
    #[error("stream processing error: {context}")]
    StreamProcessingError {
        /// Description of what went wrong during stream processing.
        context: String,
    },

    /// Wraps an error produced by user-provided functions and callbacks
    /// (domain errors, §7), so it can flow through the rivulet error system.
    #[error("user error: {0}")]
    UserError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Aggregates multiple errors that occurred together — notably the
    /// joined panics raised from `Subscription::unsubscribe()` when more
    /// than one finalizer panics (§4.3, §7 "Subscription errors").
    #[error("{count} errors occurred")]
    MultipleErrors {
        /// Number of errors aggregated.
        count: usize,
        /// The individual errors.
        errors: Vec<RivuletError>,
    },

    /// Raised by the `Timeout` operator when no `Next` arrives within the
    /// configured duration (§4.5.4).
    #[error("timed out: {context}")]
    TimeoutError {
        /// Context about the timeout (e.g. the configured duration).
        context: String,
    },

    /// Raised by `Cast` when a value fails the runtime downcast (§4.5.1).
    #[error("cast failed: {context}")]
    CastError {
        /// Description of the expected vs. actual type.
        context: String,
    },

    /// A panic caught inside an observer's `next`/`error`/`complete` entry
    /// point, converted to an error so it can be delivered downstream
    /// instead of unwinding through the producer (§4.2, §7 "Observer
    /// errors"). Panics caught inside the `error` handler itself cannot be
    /// delivered this way — see the unhandled-error hook in
    /// [`crate::hooks`].
    #[error("observer panicked: {context}")]
    ObserverPanic {
        /// The panic payload, converted to a string where possible.
        context: String,
    },
}

impl RivuletError {
    /// Creates a stream processing error with the given context.
    pub fn stream_error(context: impl Into<String>) -> Self {
        Self::StreamProcessingError {
            context: context.into(),
        }
    }

    /// Creates a timeout error with the given context.
    pub fn timeout_error(context: impl Into<String>) -> Self {
        Self::TimeoutError {
            context: context.into(),
        }
    }

    /// Creates a cast-failure error with the given context.
    pub fn cast_error(context: impl Into<String>) -> Self {
        Self::CastError {
            context: context.into(),
        }
    }

    /// Creates an observer-panic error from a caught panic payload.
    pub fn observer_panic(context: impl Into<String>) -> Self {
        Self::ObserverPanic {
            context: context.into(),
        }
    }

    /// Wraps a user error.
    pub fn user_error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::UserError(Box::new(error))
    }

    /// Aggregates a non-empty list of errors into a `MultipleErrors`
    /// variant, used when joining finalizer panics from
    /// `Subscription::unsubscribe()`.
    ///
    /// # Panics
    /// Panics if `errors` is empty — callers should only aggregate when
    /// at least one finalizer actually failed.
    pub fn aggregate(errors: Vec<RivuletError>) -> Self {
        assert!(!errors.is_empty(), "cannot aggregate zero errors");
        Self::MultipleErrors {
            count: errors.len(),
            errors,
        }
    }

    /// Aggregates multiple user errors into a `MultipleErrors` variant.
    ///
    /// # Examples
    ///
    /// ```
    /// use rivulet_core::RivuletError;
    ///
    /// #[derive(Debug, thiserror::Error)]
    /// #[error("custom error: {msg}")]
    /// struct CustomError {
    ///     msg: String,
    /// }
    ///
    /// let errors = vec![
    ///     CustomError { msg: "first".to_string() },
    ///     CustomError { msg: "second".to_string() },
    /// ];
    ///
    /// let result = RivuletError::from_user_errors(errors);
    /// assert!(matches!(result, RivuletError::MultipleErrors { count: 2, .. }));
    /// ```
    pub fn from_user_errors<E>(errors: Vec<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let count = errors.len();
        let wrapped = errors.into_iter().map(|e| Self::UserError(Box::new(e))).collect();
        Self::MultipleErrors { count, errors: wrapped }
    }

    /// Converts a caught `std::panic::catch_unwind` payload into a
    /// descriptive string, used to build [`RivuletError::ObserverPanic`].
    pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
        if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        }
    }

    /// Returns `true` if this error indicates a transient failure that
    /// could succeed on retry. No variant is currently considered
    /// recoverable on its own — `Retry`/`Catch` decide recoverability at
    /// the operator level, not from the error shape.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        false
    }

    /// Returns `true` if this error indicates a permanent failure.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::StreamProcessingError { .. } | Self::UserError(_))
    }
}

/// Specialized `Result` alias for rivulet operations.
pub type Result<T> = std::result::Result<T, RivuletError>;

/// Converts arbitrary errors into a [`RivuletError`].
pub trait IntoRivuletError {
    /// Converts this error into a `RivuletError` with additional context.
    fn into_rivulet_error(self, context: &str) -> RivuletError;

    /// Converts this error into a `RivuletError` without additional context.
    fn into_rivulet(self) -> RivuletError
    where
        Self: Sized,
    {
        self.into_rivulet_error("")
    }
}

impl<E: std::error::Error + Send + Sync + 'static> IntoRivuletError for E {
    fn into_rivulet_error(self, _context: &str) -> RivuletError {
        RivuletError::user_error(self)
    }
}

/// Helper trait for adding context to `Result`s in a fluent style.
pub trait ResultExt<T> {
    /// Adds context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Adds context to an error, computed lazily.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<RivuletError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let context = context.into();
            match e.into() {
                RivuletError::UserError(inner) => RivuletError::StreamProcessingError {
                    context: format!("{context}: {inner}"),
                },
                other => other,
            }
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let context = f();
            match e.into() {
                RivuletError::UserError(inner) => RivuletError::StreamProcessingError {
                    context: format!("{context}: {inner}"),
                },
                other => other,
            }
        })
    }
}

impl Clone for RivuletError {
    fn clone(&self) -> Self {
        match self {
            Self::StreamProcessingError { context } => Self::StreamProcessingError {
                context: context.clone(),
            },
            // UserError's boxed source isn't Clone; fold it to a string.
            Self::UserError(e) => Self::StreamProcessingError {
                context: format!("user error: {e}"),
            },
            Self::MultipleErrors { count, errors } => Self::MultipleErrors {
                count: *count,
                errors: errors.clone(),
            },
            Self::TimeoutError { context } => Self::TimeoutError {
                context: context.clone(),
            },
            Self::CastError { context } => Self::CastError {
                context: context.clone(),
            },
            Self::ObserverPanic { context } => Self::ObserverPanic {
                context: context.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_reports_count() {
        let err = RivuletError::aggregate(vec![
            RivuletError::stream_error("a"),
            RivuletError::stream_error("b"),
        ]);
        assert!(matches!(err, RivuletError::MultipleErrors { count: 2, .. }));
    }

    #[test]
    #[should_panic(expected = "cannot aggregate zero errors")]
    fn aggregate_rejects_empty() {
        let _ = RivuletError::aggregate(vec![]);
    }

    #[test]
    fn clone_folds_user_error_to_context() {
        let err = RivuletError::stream_error("boom");
        let cloned = err.clone();
        assert!(matches!(cloned, RivuletError::StreamProcessingError { .. }));
    }

    #[test]
    fn panic_message_downcasts_str_and_string() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("oops");
        assert_eq!(RivuletError::panic_message(payload.as_ref()), "oops");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("boxed"));
        assert_eq!(RivuletError::panic_message(payload.as_ref()), "boxed");
    }
}
