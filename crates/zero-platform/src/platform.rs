//! Platform
//!
//! The object the engine calls into. Routes background work to the worker
//! pool and foreground work to the right isolate, and owns isolate
//! registration and global shutdown.

use crate::config::PlatformConfig;
use crate::error::PlatformError;
use crate::isolate::{Isolate, IsolateId};
use crate::per_isolate::PerIsolatePlatformData;
use crate::sync::Mutex;
use crate::task::{Task, TaskRunner};
use crate::tracing_controller::TracingController;
use crate::worker::WorkerThreadsTaskRunner;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, OnceLock};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use zero_loop::EventLoop;

fn monotonic_epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// Embedder task-scheduling platform
pub struct Platform {
    worker_thread_task_runner: Arc<WorkerThreadsTaskRunner>,
    per_isolate: Mutex<HashMap<IsolateId, Arc<PerIsolatePlatformData>>>,
    tracing_controller: TracingController,
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("worker_thread_task_runner", &self.worker_thread_task_runner)
            .field("isolates", &self.per_isolate.lock().len())
            .finish()
    }
}

impl Platform {
    /// Start the worker pool described by `config`
    pub fn new(config: PlatformConfig) -> Self {
        // Pin the monotonic epoch before any task can ask for the time.
        monotonic_epoch();

        Self {
            worker_thread_task_runner: Arc::new(WorkerThreadsTaskRunner::new(&config)),
            per_isolate: Mutex::new(HashMap::new()),
            tracing_controller: TracingController::new(config.trace_categories),
        }
    }

    /// Default configuration with `thread_pool_size` workers
    pub fn with_thread_pool_size(thread_pool_size: usize) -> Self {
        Self::new(PlatformConfig::default().with_thread_pool_size(thread_pool_size))
    }

    /// Register `isolate` with the loop that drives it.
    ///
    /// Registering an already known isolate only bumps its reference count;
    /// the loop passed the second time is ignored.
    pub fn register_isolate(&self, isolate: Arc<dyn Isolate>, event_loop: &EventLoop) {
        let id = isolate.id();
        let mut per_isolate = self.per_isolate.lock();
        match per_isolate.entry(id) {
            Entry::Occupied(existing) => {
                let refs = existing.get().add_ref();
                tracing::debug!(isolate = %id, refs, "isolate registered again");
            }
            Entry::Vacant(slot) => {
                slot.insert(PerIsolatePlatformData::new(isolate, event_loop));
                tracing::debug!(isolate = %id, "isolate registered");
            }
        }
    }

    /// Drop one registration of `isolate`.
    ///
    /// The last one removes it, runs its pending foreground tasks and
    /// cancels its delayed ones.
    ///
    /// # Panics
    /// If `isolate` is not registered.
    pub fn unregister_isolate(&self, isolate: IsolateId) {
        let removed = {
            let mut per_isolate = self.per_isolate.lock();
            let remaining = match per_isolate.get(&isolate) {
                Some(existing) => existing.unref(),
                None => panic!("{}", PlatformError::UnregisteredIsolate(isolate)),
            };
            if remaining == 0 {
                per_isolate.remove(&isolate)
            } else {
                None
            }
        };

        // Teardown runs tasks, which may post more work through this platform.
        if let Some(platform_data) = removed {
            platform_data.dispose();
            tracing::debug!(isolate = %isolate, "isolate unregistered");
        }
    }

    pub fn is_registered(&self, isolate: IsolateId) -> bool {
        self.per_isolate.lock().contains_key(&isolate)
    }

    /// Look up the platform data of a registered isolate
    pub fn try_for_isolate(
        &self,
        isolate: IsolateId,
    ) -> Result<Arc<PerIsolatePlatformData>, PlatformError> {
        self.per_isolate
            .lock()
            .get(&isolate)
            .cloned()
            .ok_or(PlatformError::UnregisteredIsolate(isolate))
    }

    fn for_isolate(&self, isolate: IsolateId) -> Arc<PerIsolatePlatformData> {
        match self.try_for_isolate(isolate) {
            Ok(platform_data) => platform_data,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn call_on_worker_thread(&self, task: Box<dyn Task>) {
        self.worker_thread_task_runner.post_task(task);
    }

    /// Always fatal: worker threads have no timer facility
    pub fn call_delayed_on_worker_thread(&self, task: Box<dyn Task>, delay_in_seconds: f64) {
        self.worker_thread_task_runner
            .post_delayed_task(task, delay_in_seconds);
    }

    pub fn call_on_foreground_thread(&self, isolate: IsolateId, task: Box<dyn Task>) {
        self.for_isolate(isolate).post_task(task);
    }

    pub fn call_delayed_on_foreground_thread(
        &self,
        isolate: IsolateId,
        task: Box<dyn Task>,
        delay_in_seconds: f64,
    ) {
        self.for_isolate(isolate)
            .post_delayed_task(task, delay_in_seconds);
    }

    /// Alternate between draining the worker pool and flushing the isolate's
    /// foreground queue until a whole round does nothing.
    ///
    /// Must be called on the isolate's loop thread.
    pub fn drain_tasks(&self, isolate: IsolateId) {
        let per_isolate = self.for_isolate(isolate);
        loop {
            // There is no way to drain only the background tasks that belong
            // to one isolate, so this waits for the whole pool.
            self.worker_thread_task_runner.blocking_drain();
            if !per_isolate.flush_foreground_tasks_internal() {
                break;
            }
        }
    }

    /// Run pending foreground work. Must be called on the isolate's loop thread.
    pub fn flush_foreground_tasks(&self, isolate: IsolateId) -> bool {
        self.for_isolate(isolate).flush_foreground_tasks_internal()
    }

    pub fn cancel_pending_delayed_tasks(&self, isolate: IsolateId) {
        self.for_isolate(isolate).cancel_pending_delayed_tasks();
    }

    pub fn get_foreground_task_runner(&self, isolate: IsolateId) -> Arc<dyn TaskRunner> {
        self.for_isolate(isolate)
    }

    pub fn get_worker_task_runner(&self) -> Arc<dyn TaskRunner> {
        self.worker_thread_task_runner.clone()
    }

    pub fn number_of_worker_threads(&self) -> usize {
        self.worker_thread_task_runner.number_of_worker_threads()
    }

    /// Seconds on a clock that never goes backwards
    pub fn monotonically_increasing_time(&self) -> f64 {
        monotonic_epoch().elapsed().as_secs_f64()
    }

    /// Wall clock milliseconds since the Unix epoch
    pub fn current_clock_time_millis(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since_epoch| since_epoch.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }

    pub fn get_tracing_controller(&self) -> &TracingController {
        &self.tracing_controller
    }

    /// Join the worker pool, then tear down every remaining isolate.
    ///
    /// Must be the last call made on the platform.
    pub fn shutdown(&self) {
        self.worker_thread_task_runner.shutdown();

        let per_isolate = std::mem::take(&mut *self.per_isolate.lock());
        let remaining = per_isolate.len();
        for platform_data in per_isolate.into_values() {
            platform_data.dispose();
        }
        tracing::info!(remaining_isolates = remaining, "platform shut down");
    }
}
