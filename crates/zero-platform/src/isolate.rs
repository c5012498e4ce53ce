//! Engine Instances
//!
//! The platform only needs two things from an isolate: a stable identity
//! and a way to flush its pending microtasks.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsolateId(u64);

impl IsolateId {
    /// Allocate a fresh, process-unique id
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for IsolateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Isolate({})", self.0)
    }
}

/// Engine instance as seen by the platform
pub trait Isolate: Send + Sync {
    fn id(&self) -> IsolateId;

    /// Run queued promise reactions and other microtasks
    fn perform_microtask_checkpoint(&self);
}

/// Performs a microtask checkpoint when dropped.
///
/// Every foreground task runs inside one of these so promise continuations
/// it resolved run before control returns to the event loop.
pub struct InternalCallbackScope<'a> {
    isolate: &'a dyn Isolate,
}

impl<'a> InternalCallbackScope<'a> {
    pub fn new(isolate: &'a dyn Isolate) -> Self {
        Self { isolate }
    }

    /// Checkpoint immediately, without a scope
    pub fn run(isolate: &dyn Isolate) {
        isolate.perform_microtask_checkpoint();
    }
}

impl Drop for InternalCallbackScope<'_> {
    fn drop(&mut self) {
        Self::run(self.isolate);
    }
}

impl fmt::Debug for InternalCallbackScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalCallbackScope")
            .field("isolate", &self.isolate.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingIsolate {
        id: IsolateId,
        checkpoints: AtomicUsize,
    }

    impl Isolate for CountingIsolate {
        fn id(&self) -> IsolateId {
            self.id
        }

        fn perform_microtask_checkpoint(&self) {
            self.checkpoints.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_ids_are_unique() {
        let a = IsolateId::next();
        let b = IsolateId::next();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
        assert_eq!(format!("{}", IsolateId(3)), "Isolate(3)");
    }

    #[test]
    fn test_scope_checkpoints_on_drop() {
        let isolate = CountingIsolate {
            id: IsolateId::next(),
            checkpoints: AtomicUsize::new(0),
        };

        {
            let _scope = InternalCallbackScope::new(&isolate);
            assert_eq!(isolate.checkpoints.load(Ordering::SeqCst), 0);
        }
        assert_eq!(isolate.checkpoints.load(Ordering::SeqCst), 1);

        InternalCallbackScope::run(&isolate);
        assert_eq!(isolate.checkpoints.load(Ordering::SeqCst), 2);
    }
}
