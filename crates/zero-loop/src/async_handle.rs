//! Wake-up Handle
//!
//! Cross-thread signal that runs a callback on the loop thread.

use crate::event_loop::EventLoop;
use crate::handle::HandleState;
use smol::channel::{self, Sender};
use std::sync::Arc;

/// Wake-up handle bound to one [`EventLoop`].
///
/// Sends coalesce: several `send` calls made before the loop services the
/// handle result in a single callback invocation.
pub struct AsyncHandle {
    sender: Sender<()>,
    state: Arc<HandleState>,
}

impl std::fmt::Debug for AsyncHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncHandle")
            .field("state", &self.state)
            .field("closing", &self.is_closing())
            .finish()
    }
}

impl AsyncHandle {
    pub(crate) fn new<F>(event_loop: &EventLoop, mut callback: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (sender, receiver) = channel::bounded::<()>(1);
        let state = HandleState::new(Arc::clone(event_loop.inner()));
        let serviced = Arc::clone(&state);

        event_loop
            .spawn(async move {
                while receiver.recv().await.is_ok() {
                    if receiver.is_closed() {
                        break;
                    }
                    serviced.owner().note_dispatch();
                    callback();
                }
            })
            .detach();

        Self { sender, state }
    }

    /// Wake the loop. Safe to call from any thread.
    pub fn send(&self) {
        // A full channel means a wake-up is already pending.
        let _ = self.sender.try_send(());
    }

    /// Stop delivering callbacks. The loop lets go of the handle on its next turn.
    pub fn close(&self) {
        if self.sender.close() {
            tracing::trace!("wake-up handle closed");
            self.state.deactivate();
        }
    }

    pub fn is_closing(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn ref_handle(&self) {
        self.state.set_referenced(true);
    }

    pub fn unref_handle(&self) {
        self.state.set_referenced(false);
    }

    pub fn has_ref(&self) -> bool {
        self.state.is_referenced()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

impl Drop for AsyncHandle {
    fn drop(&mut self) {
        self.close();
    }
}
