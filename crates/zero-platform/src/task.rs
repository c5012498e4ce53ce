//! Tasks
//!
//! Units of deferred work handed to the platform by the engine.

/// Run-once unit of work. Ownership moves into whichever queue holds it.
pub trait Task: Send {
    fn run(self: Box<Self>);
}

impl<F> Task for F
where
    F: FnOnce() + Send,
{
    fn run(self: Box<Self>) {
        (*self)()
    }
}

/// Task that runs when the engine is idle. No runner in this crate accepts them.
pub trait IdleTask: Send {
    fn run(self: Box<Self>, deadline_in_seconds: f64);
}

impl<F> IdleTask for F
where
    F: FnOnce(f64) + Send,
{
    fn run(self: Box<Self>, deadline_in_seconds: f64) {
        (*self)(deadline_in_seconds)
    }
}

/// Where the engine posts work.
///
/// Implemented by the worker pool and by each isolate's foreground queue.
pub trait TaskRunner: Send + Sync {
    /// Schedule a task to run as soon as possible
    fn post_task(&self, task: Box<dyn Task>);

    /// Schedule a task to run no earlier than `delay_in_seconds` from now
    fn post_delayed_task(&self, task: Box<dyn Task>, delay_in_seconds: f64);

    /// Schedule an idle task. Fatal unless `idle_tasks_enabled` is true.
    fn post_idle_task(&self, task: Box<dyn IdleTask>);

    fn idle_tasks_enabled(&self) -> bool {
        false
    }
}
