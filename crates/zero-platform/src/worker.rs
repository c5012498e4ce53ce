//! Worker Threads
//!
//! Fixed pool of OS threads sharing one task queue.

use crate::config::PlatformConfig;
use crate::sync::Mutex;
use crate::task::{IdleTask, Task, TaskRunner};
use crate::task_queue::TaskQueue;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

struct Worker {
    id: usize,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("running", &self.thread.is_some())
            .finish()
    }
}

fn worker_thread_main(id: usize, pending_worker_tasks: Arc<TaskQueue<dyn Task>>) {
    while let Some(task) = pending_worker_tasks.blocking_pop() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(move || task.run())) {
            tracing::error!(worker = id, panic = panic_message(&*payload), "worker task panicked");
        }
        pending_worker_tasks.notify_of_completion();
    }
    tracing::trace!(worker = id, "worker thread exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

/// Background task runner backed by a thread pool.
///
/// Tasks start in arrival order but run concurrently, so there is no
/// ordering between tasks picked up by different threads.
pub struct WorkerThreadsTaskRunner {
    pending_worker_tasks: Arc<TaskQueue<dyn Task>>,
    workers: Mutex<Vec<Worker>>,
    worker_count: usize,
}

impl std::fmt::Debug for WorkerThreadsTaskRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerThreadsTaskRunner")
            .field("workers", &*self.workers.lock())
            .field("worker_count", &self.worker_count)
            .field("pending_worker_tasks", &self.pending_worker_tasks)
            .finish()
    }
}

impl WorkerThreadsTaskRunner {
    /// Spawn the pool described by `config`.
    ///
    /// If a thread fails to spawn the pool stops growing and runs with the
    /// threads it already has.
    pub fn new(config: &PlatformConfig) -> Self {
        let pending_worker_tasks: Arc<TaskQueue<dyn Task>> = Arc::new(TaskQueue::new());
        let mut workers = Vec::with_capacity(config.thread_pool_size);

        for id in 0..config.thread_pool_size {
            let mut builder =
                thread::Builder::new().name(format!("{}-{id}", config.thread_name_prefix));
            if let Some(stack_size) = config.thread_stack_size {
                builder = builder.stack_size(stack_size);
            }

            let queue = Arc::clone(&pending_worker_tasks);
            match builder.spawn(move || worker_thread_main(id, queue)) {
                Ok(handle) => workers.push(Worker {
                    id,
                    thread: Some(handle),
                }),
                Err(err) => {
                    // TODO: surface the shortfall to the embedder instead of only logging it.
                    tracing::warn!(
                        requested = config.thread_pool_size,
                        spawned = workers.len(),
                        error = %err,
                        "failed to spawn worker thread, continuing with a smaller pool"
                    );
                    break;
                }
            }
        }

        if workers.is_empty() {
            tracing::warn!(
                requested = config.thread_pool_size,
                "worker pool has no threads, posted worker tasks will never run"
            );
        } else {
            tracing::debug!(workers = workers.len(), "worker pool started");
        }

        Self {
            pending_worker_tasks,
            worker_count: workers.len(),
            workers: Mutex::new(workers),
        }
    }

    /// Pool with default settings and `thread_pool_size` threads
    pub fn with_thread_pool_size(thread_pool_size: usize) -> Self {
        Self::new(&PlatformConfig::default().with_thread_pool_size(thread_pool_size))
    }

    /// Wait until every queued and in-flight task has finished
    pub fn blocking_drain(&self) {
        self.pending_worker_tasks.blocking_drain();
    }

    /// Stop the queue and join every worker. Later calls do nothing.
    pub fn shutdown(&self) {
        self.pending_worker_tasks.stop();

        let workers = std::mem::take(&mut *self.workers.lock());
        for mut worker in workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    tracing::error!(worker = worker.id, "worker thread exited abnormally");
                }
            }
        }
    }

    /// Threads that were actually spawned
    pub fn number_of_worker_threads(&self) -> usize {
        self.worker_count
    }

    /// Tasks pushed and not yet finished
    pub fn outstanding_tasks(&self) -> usize {
        self.pending_worker_tasks.outstanding_tasks()
    }
}

impl TaskRunner for WorkerThreadsTaskRunner {
    fn post_task(&self, task: Box<dyn Task>) {
        self.pending_worker_tasks.push(task);
    }

    fn post_delayed_task(&self, _task: Box<dyn Task>, _delay_in_seconds: f64) {
        unreachable!("delayed tasks cannot be posted to worker threads");
    }

    fn post_idle_task(&self, _task: Box<dyn IdleTask>) {
        unreachable!("idle tasks are not supported");
    }
}

impl Drop for WorkerThreadsTaskRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}
