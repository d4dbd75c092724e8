// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(clippy::multiple_crate_versions)]
//! Shared test infrastructure for the rivulet workspace (§6 external
//! interface): a [`VirtualClock`] for deterministic timed-operator tests,
//! `Collect`/`CollectWithContext` sinks (re-exported from [`rivulet::sinks`]
//! rather than duplicated here), and the demo/recording observers named
//! alongside them — `PrintObserver`, `NoopObserver`, `RecordingObserver`.

pub mod observers;
pub mod virtual_clock;

pub use observers::{NoopObserver, PrintObserver, Recording, RecordingObserver};
pub use rivulet::sinks::{collect, collect_with_context};
pub use virtual_clock::VirtualClock;
