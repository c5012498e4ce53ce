//! Main Loop
//!
//! Drives one isolate's event loop until nothing is left to do.

use crate::isolate::{InternalCallbackScope, Isolate};
use crate::platform::Platform;
use zero_loop::{EventLoop, RunMode};

/// Run `event_loop` to exhaustion on the calling thread.
///
/// After each pass of the loop, background work is drained and the foreground
/// queue flushed, since either may have armed new timers or handles. Returns
/// once a pass leaves the loop dead.
pub fn spin_event_loop(platform: &Platform, isolate: &dyn Isolate, event_loop: &EventLoop) {
    let mut passes = 0u64;
    loop {
        event_loop.run(RunMode::Default);
        platform.drain_tasks(isolate.id());
        InternalCallbackScope::run(isolate);
        passes += 1;

        if !event_loop.is_alive() {
            break;
        }
    }
    tracing::debug!(isolate = %isolate.id(), passes, "event loop finished");
}
