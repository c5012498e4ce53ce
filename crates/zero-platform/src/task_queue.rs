//! Task Queue
//!
//! Thread-safe FIFO of owned work items with blocking pop, drain tracking and
//! a stop protocol.

use crate::sync::{ConditionVariable, Mutex};
use std::collections::VecDeque;

struct State<T: ?Sized> {
    queue: VecDeque<Box<T>>,
    /// Pushed but not yet reported complete
    outstanding_tasks: usize,
    stopped: bool,
}

/// FIFO queue shared between producers and consumers.
///
/// `outstanding_tasks` goes up on every push and only comes down through
/// [`TaskQueue::notify_of_completion`], so a consumer can finish running an
/// item before it counts as done.
pub struct TaskQueue<T: ?Sized> {
    lock: Mutex<State<T>>,
    tasks_available: ConditionVariable,
    tasks_drained: ConditionVariable,
}

impl<T: ?Sized> std::fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock.lock();
        f.debug_struct("TaskQueue")
            .field("len", &state.queue.len())
            .field("outstanding_tasks", &state.outstanding_tasks)
            .field("stopped", &state.stopped)
            .finish()
    }
}

impl<T: ?Sized> Default for TaskQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(State {
                queue: VecDeque::new(),
                outstanding_tasks: 0,
                stopped: false,
            }),
            tasks_available: ConditionVariable::new(),
            tasks_drained: ConditionVariable::new(),
        }
    }

    /// Enqueue an item and wake one blocked popper.
    ///
    /// Items pushed after [`stop`](Self::stop) are still stored, but only
    /// `pop` and `pop_all` will ever hand them out.
    pub fn push(&self, task: Box<T>) {
        let mut state = self.lock.lock();
        state.outstanding_tasks += 1;
        state.queue.push_back(task);
        self.tasks_available.signal(&state);
    }

    /// Take the front item without blocking
    pub fn pop(&self) -> Option<Box<T>> {
        self.lock.lock().queue.pop_front()
    }

    /// Wait for an item. Returns `None` once the queue is stopped.
    pub fn blocking_pop(&self) -> Option<Box<T>> {
        let mut state = self.lock.lock();
        while state.queue.is_empty() && !state.stopped {
            self.tasks_available.wait(&mut state);
        }
        if state.stopped {
            return None;
        }
        state.queue.pop_front()
    }

    /// Report that one popped item finished running
    pub fn notify_of_completion(&self) {
        let mut state = self.lock.lock();
        debug_assert!(state.outstanding_tasks > 0, "completion without a pushed task");
        state.outstanding_tasks = state.outstanding_tasks.saturating_sub(1);
        if state.outstanding_tasks == 0 {
            self.tasks_drained.broadcast(&state);
        }
    }

    /// Block until every pushed item has been reported complete
    pub fn blocking_drain(&self) {
        let mut state = self.lock.lock();
        while state.outstanding_tasks > 0 {
            self.tasks_drained.wait(&mut state);
        }
    }

    /// Release all blocked poppers. Idempotent.
    pub fn stop(&self) {
        let mut state = self.lock.lock();
        state.stopped = true;
        self.tasks_available.broadcast(&state);
    }

    /// Swap out everything queued so far
    pub fn pop_all(&self) -> VecDeque<Box<T>> {
        std::mem::take(&mut self.lock.lock().queue)
    }

    pub fn len(&self) -> usize {
        self.lock.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock.lock().queue.is_empty()
    }

    pub fn outstanding_tasks(&self) -> usize {
        self.lock.lock().outstanding_tasks
    }

    pub fn is_stopped(&self) -> bool {
        self.lock.lock().stopped
    }
}
