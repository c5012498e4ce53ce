//! Edge case tests for zero-loop
//!
//! Run modes, handle liveness and cross-thread wake-ups.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use zero_loop::{EventLoop, RunMode};

// ============================================================================
// RUN MODE TESTS
// ============================================================================

#[test]
fn test_run_once_returns_after_first_dispatch() {
    let event_loop = EventLoop::new();
    let fired = Arc::new(AtomicUsize::new(0));

    let first = Arc::clone(&fired);
    let _short = event_loop.start_timer(Duration::from_millis(10), move || {
        first.fetch_add(1, Ordering::SeqCst);
    });
    let second = Arc::clone(&fired);
    let _long = event_loop.start_timer(Duration::from_secs(30), move || {
        second.fetch_add(1, Ordering::SeqCst);
    });

    let start = Instant::now();
    assert!(event_loop.run(RunMode::Once));
    assert!(start.elapsed() < Duration::from_secs(10));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(event_loop.active_handles(), 1);
}

#[test]
fn test_timers_fire_in_due_order() {
    let event_loop = EventLoop::new();
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let mut timers = Vec::new();
    for (label, millis) in [("c", 30u64), ("a", 5), ("b", 15)] {
        let order = Arc::clone(&order);
        timers.push(event_loop.start_timer(Duration::from_millis(millis), move || {
            order.lock().push(label);
        }));
    }

    assert!(!event_loop.run(RunMode::Default));
    assert_eq!(*order.lock(), vec!["a", "b", "c"]);
}

#[test]
fn test_detached_timer_still_fires() {
    let event_loop = EventLoop::new();
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&fired);
    event_loop
        .start_timer(Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .detach();

    assert!(event_loop.is_alive());
    assert!(!event_loop.run(RunMode::Default));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

// ============================================================================
// WAKE-UP HANDLE TESTS
// ============================================================================

#[test]
fn test_referenced_handle_keeps_loop_alive() {
    let event_loop = EventLoop::new();
    let wakeups = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&wakeups);
    let stopper = event_loop.clone();
    let handle = event_loop.async_handle(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        stopper.stop();
    });
    assert!(handle.has_ref());
    assert!(event_loop.is_alive());

    let handle = Arc::new(handle);
    let remote = Arc::clone(&handle);
    let sender = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        remote.send();
    });

    assert!(event_loop.run(RunMode::Default));
    sender.join().unwrap();
    assert_eq!(wakeups.load(Ordering::SeqCst), 1);

    handle.close();
    assert!(handle.is_closing());
    assert!(!event_loop.run(RunMode::NoWait));
}

#[test]
fn test_ref_after_unref_restores_liveness() {
    let event_loop = EventLoop::new();
    let handle = event_loop.async_handle(|| {});

    handle.unref_handle();
    handle.unref_handle();
    assert!(!event_loop.is_alive());

    handle.ref_handle();
    assert!(event_loop.is_alive());
    assert_eq!(event_loop.active_handles(), 1);

    drop(handle);
    assert!(!event_loop.is_alive());
}
