//! Event Loop
//!
//! The loop is an `Executor` that exactly one thread drives. Handles may be
//! created and signalled from any thread, but their callbacks only ever run
//! on the thread calling [`EventLoop::run`].

use crate::async_handle::AsyncHandle;
use crate::timer::TimerHandle;
use smol::{Executor, Task};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// How long [`EventLoop::run`] keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Run until no referenced handle is active or `stop` is called
    Default,
    /// Run until at least one callback was dispatched, blocking if needed
    Once,
    /// Run whatever is ready and return without blocking
    NoWait,
}

pub(crate) struct LoopInner {
    executor: Executor<'static>,
    /// Active and referenced handles
    alive: AtomicUsize,
    /// Callbacks dispatched so far
    dispatched: AtomicU64,
    stop_requested: AtomicBool,
}

impl LoopInner {
    pub(crate) fn retain(&self) {
        self.alive.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn release(&self) {
        self.alive.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn note_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }
}

/// Handle to a single-threaded event loop
#[derive(Clone)]
pub struct EventLoop {
    inner: Arc<LoopInner>,
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("active_handles", &self.active_handles())
            .field("dispatched", &self.inner.dispatched.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    /// Create a new, empty loop
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LoopInner {
                executor: Executor::new(),
                alive: AtomicUsize::new(0),
                dispatched: AtomicU64::new(0),
                stop_requested: AtomicBool::new(false),
            }),
        }
    }

    /// Drive the loop on the calling thread.
    ///
    /// Returns whether the loop is still alive afterwards.
    pub fn run(&self, mode: RunMode) -> bool {
        match mode {
            RunMode::NoWait => {
                self.run_ready();
            }
            RunMode::Once => {
                let before = self.inner.dispatched.load(Ordering::Relaxed);
                loop {
                    self.run_ready();
                    if self.inner.dispatched.load(Ordering::Relaxed) != before
                        || !self.is_alive()
                        || self.inner.stop_requested.swap(false, Ordering::AcqRel)
                    {
                        break;
                    }
                    smol::block_on(self.inner.executor.tick());
                }
            }
            RunMode::Default => loop {
                self.run_ready();
                if self.inner.stop_requested.swap(false, Ordering::AcqRel) || !self.is_alive() {
                    break;
                }
                smol::block_on(self.inner.executor.tick());
            },
        }
        // A stop request only ever ends the run it arrived in, or the next one.
        self.inner.stop_requested.store(false, Ordering::Release);
        self.is_alive()
    }

    /// Whether any active, referenced handle remains
    pub fn is_alive(&self) -> bool {
        self.active_handles() > 0
    }

    /// Number of active, referenced handles
    pub fn active_handles(&self) -> usize {
        self.inner.alive.load(Ordering::Acquire)
    }

    /// Make the current (or next) `run` return early. Safe from any thread.
    pub fn stop(&self) {
        self.inner.stop_requested.store(true, Ordering::Release);
        tracing::trace!("event loop stop requested");
        // Wakes a thread parked in `tick`.
        self.inner.executor.spawn(async {}).detach();
    }

    /// Create a wake-up handle whose callback runs on the loop thread
    pub fn async_handle<F>(&self, callback: F) -> AsyncHandle
    where
        F: FnMut() + Send + 'static,
    {
        AsyncHandle::new(self, callback)
    }

    /// Start a one-shot timer
    pub fn start_timer<F>(&self, timeout: Duration, callback: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        TimerHandle::start(self, timeout, callback)
    }

    pub(crate) fn inner(&self) -> &Arc<LoopInner> {
        &self.inner
    }

    pub(crate) fn spawn<Fut>(&self, future: Fut) -> Task<()>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.executor.spawn(future)
    }

    fn run_ready(&self) -> bool {
        let mut ran = false;
        while self.inner.executor.try_tick() {
            ran = true;
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_empty_loop_is_dead() {
        let event_loop = EventLoop::new();
        assert!(!event_loop.is_alive());
        assert!(!event_loop.run(RunMode::Default));
        assert!(!event_loop.run(RunMode::Once));
        assert!(!event_loop.run(RunMode::NoWait));
    }

    #[test]
    fn test_stop_from_another_thread() {
        let event_loop = EventLoop::new();
        let keepalive = event_loop.start_timer(Duration::from_secs(30), || {});

        let remote = event_loop.clone();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.stop();
        });

        let start = Instant::now();
        assert!(event_loop.run(RunMode::Default));
        assert!(start.elapsed() < Duration::from_secs(10));

        stopper.join().unwrap();
        drop(keepalive);
        assert!(!event_loop.is_alive());
    }

    #[test]
    fn test_no_wait_consumes_stop_request() {
        let event_loop = EventLoop::new();
        let fired = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&fired);
        let _timer = event_loop.start_timer(Duration::from_millis(20), move || {
            flag.store(true, Ordering::SeqCst);
        });

        event_loop.stop();
        event_loop.run(RunMode::NoWait);

        assert!(!event_loop.run(RunMode::Default));
        assert!(fired.load(Ordering::SeqCst));
    }

    #[test]
    fn test_no_wait_does_not_block() {
        let event_loop = EventLoop::new();
        let _keepalive = event_loop.start_timer(Duration::from_secs(30), || {});

        let start = Instant::now();
        assert!(event_loop.run(RunMode::NoWait));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
