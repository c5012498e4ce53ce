//! Per-Isolate Foreground Scheduling
//!
//! Each registered isolate gets one [`PerIsolatePlatformData`] bound to the
//! event loop that drives it. Tasks can be posted from any thread; they only
//! ever run on the loop's thread, one at a time, in post order.
//!
//! Delayed tasks go through a second queue. The next flush on the loop thread
//! turns each of them into an unreferenced loop timer and records it in the
//! scheduled set, which is what teardown cancels.

use crate::isolate::{InternalCallbackScope, Isolate, IsolateId};
use crate::sync::Mutex;
use crate::task::{IdleTask, Task, TaskRunner};
use crate::task_queue::TaskQueue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use zero_loop::{AsyncHandle, EventLoop, TimerHandle};

/// Longest delay a timer is armed for (about 49 days)
const MAX_DELAY_MS: u64 = u32::MAX as u64;

/// Convert a delay in seconds to a timer timeout, rounding up to whole
/// milliseconds so a timer never fires early. Negative and NaN delays become
/// zero.
pub fn delay_to_timeout(delay_in_seconds: f64) -> Duration {
    if delay_in_seconds.is_nan() || delay_in_seconds <= 0.0 {
        return Duration::ZERO;
    }
    let millis = (delay_in_seconds * 1000.0).ceil();
    if millis >= MAX_DELAY_MS as f64 {
        Duration::from_millis(MAX_DELAY_MS)
    } else {
        Duration::from_millis(millis as u64)
    }
}

/// A task waiting for its timer.
///
/// Holds the owning instance alive until the timer fires or is cancelled.
pub struct DelayedTask {
    id: u64,
    task: Box<dyn Task>,
    timeout: f64,
    platform_data: Arc<PerIsolatePlatformData>,
}

impl std::fmt::Debug for DelayedTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayedTask")
            .field("id", &self.id)
            .field("timeout", &self.timeout)
            .field("isolate", &self.platform_data.isolate_id())
            .finish()
    }
}

/// Foreground scheduling state for one isolate
pub struct PerIsolatePlatformData {
    isolate: Arc<dyn Isolate>,
    event_loop: EventLoop,
    flush_tasks: AsyncHandle,
    foreground_tasks: TaskQueue<dyn Task>,
    foreground_delayed_tasks: TaskQueue<DelayedTask>,
    scheduled_delayed_tasks: Mutex<HashMap<u64, TimerHandle>>,
    next_delayed_task_id: AtomicU64,
    ref_count: AtomicUsize,
    disposed: AtomicBool,
    /// Set once the final flush of teardown is done
    closed: AtomicBool,
    weak_self: Weak<Self>,
}

impl std::fmt::Debug for PerIsolatePlatformData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerIsolatePlatformData")
            .field("isolate", &self.isolate.id())
            .field("foreground_tasks", &self.foreground_tasks)
            .field("foreground_delayed_tasks", &self.foreground_delayed_tasks)
            .field("scheduled_delayed_tasks", &self.pending_delayed_task_count())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

impl PerIsolatePlatformData {
    /// Bind a new instance to `isolate` and `event_loop`.
    ///
    /// The wake-up handle is unreferenced: it never keeps the loop alive on
    /// its own.
    pub fn new(isolate: Arc<dyn Isolate>, event_loop: &EventLoop) -> Arc<Self> {
        Arc::new_cyclic(|weak_self: &Weak<Self>| {
            let flush_target = Weak::clone(weak_self);
            let flush_tasks = event_loop.async_handle(move || {
                if let Some(platform_data) = flush_target.upgrade() {
                    platform_data.flush_foreground_tasks_internal();
                }
            });
            flush_tasks.unref_handle();

            Self {
                isolate,
                event_loop: event_loop.clone(),
                flush_tasks,
                foreground_tasks: TaskQueue::new(),
                foreground_delayed_tasks: TaskQueue::new(),
                scheduled_delayed_tasks: Mutex::new(HashMap::new()),
                next_delayed_task_id: AtomicU64::new(0),
                ref_count: AtomicUsize::new(1),
                disposed: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                weak_self: Weak::clone(weak_self),
            }
        })
    }

    pub fn isolate_id(&self) -> IsolateId {
        self.isolate.id()
    }

    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Run pending work on the loop thread.
    ///
    /// Arms a timer for every newly delayed task, then runs every immediate
    /// task queued so far in FIFO order. Returns whether anything was done.
    pub fn flush_foreground_tasks_internal(&self) -> bool {
        let mut did_work = false;

        while let Some(delayed) = self.foreground_delayed_tasks.pop() {
            did_work = true;
            self.schedule_delayed_task(delayed);
        }

        let mut tasks = self.foreground_tasks.pop_all();
        let count = tasks.len();
        while let Some(task) = tasks.pop_front() {
            did_work = true;
            self.run_foreground_task(task);
        }

        if did_work {
            tracing::trace!(isolate = %self.isolate_id(), tasks = count, "flushed foreground tasks");
        }
        did_work
    }

    /// Drop every armed delayed task without running it
    pub fn cancel_pending_delayed_tasks(&self) {
        let scheduled = std::mem::take(&mut *self.scheduled_delayed_tasks.lock());
        if !scheduled.is_empty() {
            tracing::debug!(
                isolate = %self.isolate_id(),
                cancelled = scheduled.len(),
                "cancelled pending delayed tasks"
            );
        }
        drop(scheduled);
    }

    /// Delayed tasks whose timer is armed and has not fired
    pub fn pending_delayed_task_count(&self) -> usize {
        self.scheduled_delayed_tasks.lock().len()
    }

    /// Add a registration. Returns the new count.
    pub fn add_ref(&self) -> usize {
        self.ref_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Drop a registration. Returns the remaining count.
    pub fn unref(&self) -> usize {
        let previous = self.ref_count.fetch_sub(1, Ordering::AcqRel);
        assert!(previous > 0, "unref on {} with no registrations", self.isolate_id());
        previous - 1
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::Acquire)
    }

    /// Whether teardown has finished flushing. Posts after this point are
    /// dropped without running.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Tear down: run pending immediate tasks to completion, cancel delayed
    /// ones, close the wake-up handle. Runs once; later calls do nothing.
    pub(crate) fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        while self.flush_foreground_tasks_internal() {}

        // Anything that slipped in after the last flush was posted too late.
        self.closed.store(true, Ordering::SeqCst);
        drop(self.foreground_tasks.pop_all());
        drop(self.foreground_delayed_tasks.pop_all());

        self.cancel_pending_delayed_tasks();
        self.flush_tasks.close();
    }

    fn run_foreground_task(&self, task: Box<dyn Task>) {
        let _scope = InternalCallbackScope::new(self.isolate.as_ref());
        task.run();
    }

    fn schedule_delayed_task(&self, delayed: Box<DelayedTask>) {
        let id = delayed.id;
        let timeout = delay_to_timeout(delayed.timeout);

        // Equal timeouts may fire in any order.
        let timer = self
            .event_loop
            .start_timer(timeout, move || Self::run_delayed_task(delayed));
        timer.unref_handle();

        self.scheduled_delayed_tasks.lock().insert(id, timer);
    }

    fn run_delayed_task(delayed: Box<DelayedTask>) {
        let DelayedTask {
            id,
            task,
            platform_data,
            ..
        } = *delayed;
        platform_data.run_foreground_task(task);
        platform_data.delete_from_scheduled_tasks(id);
    }

    fn delete_from_scheduled_tasks(&self, id: u64) {
        let timer = self.scheduled_delayed_tasks.lock().remove(&id);
        // Missing when the task itself tore this instance down.
        if let Some(timer) = timer {
            timer.detach();
        }
    }
}

impl TaskRunner for PerIsolatePlatformData {
    fn post_task(&self, task: Box<dyn Task>) {
        if self.is_closed() {
            tracing::debug!(isolate = %self.isolate_id(), "task posted after teardown, dropping");
            return;
        }
        self.foreground_tasks.push(task);

        // Teardown may have closed between the check and the push.
        if self.is_closed() {
            drop(self.foreground_tasks.pop_all());
            return;
        }
        self.flush_tasks.send();
    }

    fn post_delayed_task(&self, task: Box<dyn Task>, delay_in_seconds: f64) {
        if self.is_closed() {
            tracing::debug!(isolate = %self.isolate_id(), "delayed task posted after teardown, dropping");
            return;
        }
        let Some(platform_data) = self.weak_self.upgrade() else {
            tracing::debug!(isolate = %self.isolate_id(), "delayed task posted during teardown, dropping");
            return;
        };

        let id = self.next_delayed_task_id.fetch_add(1, Ordering::Relaxed);
        self.foreground_delayed_tasks.push(Box::new(DelayedTask {
            id,
            task,
            timeout: delay_in_seconds,
            platform_data,
        }));

        // Nothing flushes the delayed queue once closed, and each entry pins `self`.
        if self.is_closed() {
            drop(self.foreground_delayed_tasks.pop_all());
            return;
        }
        self.flush_tasks.send();
    }

    fn post_idle_task(&self, _task: Box<dyn IdleTask>) {
        unreachable!("idle tasks are not supported");
    }
}

impl Drop for PerIsolatePlatformData {
    fn drop(&mut self) {
        self.dispose();
    }
}
