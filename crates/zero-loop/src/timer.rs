//! Timers
//!
//! One-shot timers scheduled on the loop's executor.

use crate::event_loop::EventLoop;
use crate::handle::HandleState;
use smol::{Task, Timer};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One-shot timer.
///
/// Dropping the handle before the timer fires cancels it.
pub struct TimerHandle {
    task: Option<Task<()>>,
    state: Arc<HandleState>,
    due: Instant,
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("state", &self.state)
            .field("due", &self.due)
            .finish()
    }
}

impl TimerHandle {
    pub(crate) fn start<F>(event_loop: &EventLoop, timeout: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let due = Instant::now() + timeout;
        let state = HandleState::new(Arc::clone(event_loop.inner()));
        let fired = Arc::clone(&state);

        let task = event_loop.spawn(async move {
            Timer::at(due).await;
            fired.deactivate();
            fired.owner().note_dispatch();
            callback();
        });

        Self {
            task: Some(task),
            state,
            due,
        }
    }

    /// When the timer fires
    pub fn due(&self) -> Instant {
        self.due
    }

    /// Cancel the timer if it has not fired yet
    pub fn stop(self) {
        drop(self);
    }

    /// Let the timer run to completion without keeping its handle.
    ///
    /// This is the only safe way to release a timer from inside its own callback.
    pub fn detach(mut self) {
        if let Some(task) = self.task.take() {
            task.detach();
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn ref_handle(&self) {
        self.state.set_referenced(true);
    }

    pub fn unref_handle(&self) {
        self.state.set_referenced(false);
    }

    pub fn has_ref(&self) -> bool {
        self.state.is_referenced()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            drop(task);
            self.state.deactivate();
        }
    }
}
