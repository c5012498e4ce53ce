//! Tracing Controller
//!
//! Engine trace events forwarded to `tracing`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Records engine trace events for the configured categories
#[derive(Debug, Default)]
pub struct TracingController {
    enabled_categories: HashSet<String>,
    next_handle: AtomicU64,
}

impl TracingController {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled_categories: categories.into_iter().map(Into::into).collect(),
            next_handle: AtomicU64::new(0),
        }
    }

    pub fn is_category_enabled(&self, category: &str) -> bool {
        self.enabled_categories.contains("*") || self.enabled_categories.contains(category)
    }

    /// Record an event. Returns 0 when the category is disabled.
    pub fn add_trace_event(&self, category: &str, name: &str) -> u64 {
        if !self.is_category_enabled(category) {
            return 0;
        }
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(target: "zero::trace_event", category, name, handle, "trace event");
        handle
    }

    /// Close the duration of an event opened by `add_trace_event`
    pub fn update_trace_event_duration(&self, category: &str, name: &str, handle: u64) {
        if handle == 0 || !self.is_category_enabled(category) {
            return;
        }
        tracing::trace!(target: "zero::trace_event", category, name, handle, "trace event end");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_by_default() {
        let controller = TracingController::default();
        assert!(!controller.is_category_enabled("v8"));
        assert_eq!(controller.add_trace_event("v8", "GC"), 0);
    }

    #[test]
    fn test_handles_increase() {
        let controller = TracingController::new(["v8"]);
        let first = controller.add_trace_event("v8", "Compile");
        let second = controller.add_trace_event("v8", "Execute");
        assert!(first > 0);
        assert!(second > first);
        assert_eq!(controller.add_trace_event("zero", "Other"), 0);
        controller.update_trace_event_duration("v8", "Compile", first);
    }

    #[test]
    fn test_wildcard() {
        let controller = TracingController::new(vec!["*".to_string()]);
        assert!(controller.is_category_enabled("anything"));
    }
}
