//! Shared fixtures for the platform integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing_subscriber::EnvFilter;
use zero_platform::{Isolate, IsolateId};

/// Log to the test harness when `RUST_LOG` is set
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Isolate stand-in that counts microtask checkpoints
pub struct TestIsolate {
    id: IsolateId,
    checkpoints: AtomicUsize,
}

impl TestIsolate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: IsolateId::next(),
            checkpoints: AtomicUsize::new(0),
        })
    }

    pub fn checkpoints(&self) -> usize {
        self.checkpoints.load(Ordering::SeqCst)
    }
}

impl Isolate for TestIsolate {
    fn id(&self) -> IsolateId {
        self.id
    }

    fn perform_microtask_checkpoint(&self) {
        self.checkpoints.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sets its flag when dropped
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}
