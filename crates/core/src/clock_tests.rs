// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_deadline_is_in_the_future() {
    let clock = SystemClock;
    let deadline = clock.deadline(Duration::from_secs(5));
    assert!(deadline > clock.now());
}

#[test]
fn fake_clock_advances_shared_time() {
    let clock = FakeClock::new();
    let observer = clock.clone();
    let start = observer.now();

    clock.advance(Duration::from_secs(30));

    assert_eq!(observer.now().duration_since(start), Duration::from_secs(30));
}

#[test]
fn fake_clock_deadline_passes_only_after_advancing() {
    let clock = FakeClock::new();
    let deadline = clock.deadline(Duration::from_millis(250));

    assert!(clock.now() < deadline);
    clock.advance(Duration::from_millis(250));
    assert!(clock.now() >= deadline);
}

#[test]
fn clock_is_usable_as_trait_object() {
    let clock: std::sync::Arc<dyn Clock> = std::sync::Arc::new(FakeClock::new());
    let a = clock.now();
    let b = clock.now();
    assert_eq!(a, b);
}
