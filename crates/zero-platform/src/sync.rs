//! Synchronization Primitives
//!
//! Scoped locking on top of `parking_lot`. A condition variable can only be
//! signalled while the matching lock is held.

use std::time::Duration;

pub use parking_lot::Mutex;
pub use parking_lot::MutexGuard as ScopedLock;

/// Condition variable paired with a [`ScopedLock`]
#[derive(Debug, Default)]
pub struct ConditionVariable {
    inner: parking_lot::Condvar,
}

impl ConditionVariable {
    pub const fn new() -> Self {
        Self {
            inner: parking_lot::Condvar::new(),
        }
    }

    /// Wake one waiter
    pub fn signal<T>(&self, _lock: &ScopedLock<'_, T>) {
        self.inner.notify_one();
    }

    /// Wake every waiter
    pub fn broadcast<T>(&self, _lock: &ScopedLock<'_, T>) {
        self.inner.notify_all();
    }

    pub fn wait<T>(&self, lock: &mut ScopedLock<'_, T>) {
        self.inner.wait(lock);
    }

    /// Returns `false` if the timeout elapsed without a wake-up.
    pub fn wait_for<T>(&self, lock: &mut ScopedLock<'_, T>, timeout: Duration) -> bool {
        !self.inner.wait_for(lock, timeout).timed_out()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_signal_wakes_waiter() {
        let pair = Arc::new((Mutex::new(false), ConditionVariable::new()));

        let remote = Arc::clone(&pair);
        let waker = thread::spawn(move || {
            let (lock, cond) = &*remote;
            let mut ready = lock.lock();
            *ready = true;
            cond.signal(&ready);
        });

        let (lock, cond) = &*pair;
        let mut ready = lock.lock();
        while !*ready {
            cond.wait(&mut ready);
        }
        drop(ready);
        waker.join().unwrap();
    }

    #[test]
    fn test_wait_for_times_out() {
        let lock = Mutex::new(());
        let cond = ConditionVariable::new();
        let mut guard = lock.lock();
        assert!(!cond.wait_for(&mut guard, Duration::from_millis(10)));
    }
}
