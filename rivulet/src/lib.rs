// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Observable/Observer/Subscriber/Subscription and the operator engine.
//!
//! `rivulet` builds on the event/context/error plumbing in `rivulet-core`
//! to provide:
//! - [`Observable`] — a re-executable production function.
//! - [`Subscriber`] — the monotonic state machine guarding an observer.
//! - [`Subscription`] — the composite teardown tree.
//! - [`subject`] — the four multicast variants.
//! - [`Connectable`] — deferred-connect multicasting.
//! - [`operators`] — the operator engine, grouped by family.
//! - [`sources`] and [`sinks`] — the observable constructors and blocking
//!   consumers making up the library's external interface.

pub mod connectable;
pub mod operators;
pub mod observable;
pub mod pipe;
pub mod sinks;
pub mod sources;
pub mod subject;
pub mod subscriber;
pub mod subscription;

pub use connectable::{Connectable, ConnectableConfig};
pub use observable::{Observable, Teardown};
pub use pipe::{pipe, Operator};
pub use subject::{AsyncSubject, BehaviorSubject, PublishSubject, ReplaySubject, UnicastSubject};
pub use subscriber::{Safety, Subscriber};
pub use subscription::Subscription;

/// Convenience re-exports for `use rivulet::prelude::*;`.
pub mod prelude {
    pub use crate::observable::{Observable, Teardown};
    pub use crate::subject::{AsyncSubject, BehaviorSubject, PublishSubject, ReplaySubject, UnicastSubject};
    pub use crate::subscriber::{Safety, Subscriber};
    pub use crate::subscription::Subscription;
    pub use rivulet_core::prelude::*;
}
