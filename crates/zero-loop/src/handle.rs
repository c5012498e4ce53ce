//! Handle liveness accounting
//!
//! A handle keeps its loop alive while it is both active and referenced.

use crate::event_loop::LoopInner;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
struct Flags {
    active: bool,
    referenced: bool,
}

/// Shared between a handle and the future that services it.
pub(crate) struct HandleState {
    owner: Arc<LoopInner>,
    flags: Mutex<Flags>,
}

impl HandleState {
    /// New handles start active and referenced.
    pub(crate) fn new(owner: Arc<LoopInner>) -> Arc<Self> {
        owner.retain();
        Arc::new(Self {
            owner,
            flags: Mutex::new(Flags {
                active: true,
                referenced: true,
            }),
        })
    }

    pub(crate) fn set_referenced(&self, referenced: bool) {
        let mut flags = self.flags.lock();
        if flags.referenced == referenced {
            return;
        }
        flags.referenced = referenced;
        if flags.active {
            if referenced {
                self.owner.retain();
            } else {
                self.owner.release();
            }
        }
    }

    pub(crate) fn deactivate(&self) {
        let mut flags = self.flags.lock();
        if !flags.active {
            return;
        }
        flags.active = false;
        if flags.referenced {
            self.owner.release();
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.flags.lock().active
    }

    pub(crate) fn is_referenced(&self) -> bool {
        self.flags.lock().referenced
    }

    pub(crate) fn owner(&self) -> &LoopInner {
        &self.owner
    }
}

impl std::fmt::Debug for HandleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flags = *self.flags.lock();
        f.debug_struct("HandleState")
            .field("active", &flags.active)
            .field("referenced", &flags.referenced)
            .finish()
    }
}
