// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Drives the timed operator family with a [`VirtualClock`] instead of
//! real wall-clock sleeps, the scenario the clock was built for.

use rivulet::sources::{from_iter, never};
use rivulet_test_utils::{collect, VirtualClock};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn delay_on_a_virtual_clock_never_blocks_the_test_on_real_time() {
    let clock = Arc::new(VirtualClock::new());
    let observable = from_iter(vec![1, 2, 3]).delay_on(Duration::from_secs(3600), Arc::clone(&clock) as _);

    let clock_for_advance = Arc::clone(&clock);
    let advancer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        clock_for_advance.advance(Duration::from_secs(7200));
    });

    let (values, error) = collect(&observable);
    advancer.join().unwrap();

    assert_eq!(values, vec![1, 2, 3]);
    assert!(error.is_none());
}

#[test]
fn timeout_on_a_virtual_clock_fires_once_advanced_past_the_window() {
    let clock = Arc::new(VirtualClock::new());
    let observable = never::<i32>().timeout_on(Duration::from_secs(60), Arc::clone(&clock) as _);

    let clock_for_advance = Arc::clone(&clock);
    let advancer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        clock_for_advance.advance(Duration::from_secs(120));
    });

    let (values, error) = collect(&observable);
    advancer.join().unwrap();

    assert!(values.is_empty());
    assert!(error.is_some());
}
