// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The operator engine (§4.5, component C6): one module per family, each
//! adding methods directly to [`crate::observable::Observable`].
//!
//! Every family shares the failure semantics in §4.5 "Failure semantics
//! common to all operators": a panic escaping an operator callback is
//! converted to an `Error` delivered downstream, and the subscriber's
//! monotonic state machine (§4.2) guarantees that conversion can only ever
//! happen once per subscription.

pub mod combining;
pub mod filtering;
pub mod flattening;
pub(crate) mod support;
pub mod timed;
pub mod transform;
pub mod utility;
