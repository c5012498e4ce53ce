//! Platform Configuration

use crate::error::PlatformError;

/// Worker pool size used by the runtime's own bootstrap
pub const DEFAULT_THREAD_POOL_SIZE: usize = 4;

pub const THREAD_POOL_SIZE_VAR: &str = "ZERO_THREAD_POOL_SIZE";
pub const WORKER_STACK_SIZE_VAR: &str = "ZERO_WORKER_STACK_SIZE";
pub const TRACE_CATEGORIES_VAR: &str = "ZERO_TRACE_CATEGORIES";

/// Platform configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Requested number of worker threads
    pub thread_pool_size: usize,

    /// Worker threads are named `{prefix}-{index}`
    pub thread_name_prefix: String,

    /// Worker stack size in bytes (platform default if unset)
    pub thread_stack_size: Option<usize>,

    /// Trace event categories to record (`*` records everything)
    pub trace_categories: Vec<String>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            thread_pool_size: DEFAULT_THREAD_POOL_SIZE,
            thread_name_prefix: "zero-worker".to_string(),
            thread_stack_size: None,
            trace_categories: Vec::new(),
        }
    }
}

impl PlatformConfig {
    /// Defaults overlaid with `ZERO_*` environment variables
    pub fn from_env() -> Result<Self, PlatformError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PlatformError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(THREAD_POOL_SIZE_VAR) {
            config.thread_pool_size = match value.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(PlatformError::InvalidConfig {
                        key: THREAD_POOL_SIZE_VAR,
                        value,
                    });
                }
            };
        }

        if let Some(value) = lookup(WORKER_STACK_SIZE_VAR) {
            let size = value.trim().parse::<usize>().map_err(|_| PlatformError::InvalidConfig {
                key: WORKER_STACK_SIZE_VAR,
                value: value.clone(),
            })?;
            config.thread_stack_size = Some(size);
        }

        if let Some(value) = lookup(TRACE_CATEGORIES_VAR) {
            config.trace_categories = value
                .split(',')
                .map(str::trim)
                .filter(|category| !category.is_empty())
                .map(str::to_string)
                .collect();
        }

        Ok(config)
    }

    /// Same configuration with a different pool size, at least one thread
    pub fn with_thread_pool_size(mut self, thread_pool_size: usize) -> Self {
        self.thread_pool_size = thread_pool_size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PlatformConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, PlatformConfig::default());
        assert_eq!(config.thread_pool_size, 4);
    }

    #[test]
    fn test_overrides() {
        let config = PlatformConfig::from_lookup(lookup_from(&[
            (THREAD_POOL_SIZE_VAR, " 8 "),
            (WORKER_STACK_SIZE_VAR, "1048576"),
            (TRACE_CATEGORIES_VAR, "v8, zero.gc,,"),
        ]))
        .unwrap();

        assert_eq!(config.thread_pool_size, 8);
        assert_eq!(config.thread_stack_size, Some(1048576));
        assert_eq!(config.trace_categories, vec!["v8", "zero.gc"]);
    }

    #[test]
    fn test_rejects_bad_pool_size() {
        for bad in ["0", "-1", "four"] {
            let err = PlatformConfig::from_lookup(lookup_from(&[(THREAD_POOL_SIZE_VAR, bad)]))
                .unwrap_err();
            assert_eq!(
                err,
                PlatformError::InvalidConfig {
                    key: THREAD_POOL_SIZE_VAR,
                    value: bad.to_string(),
                }
            );
        }
    }

    #[test]
    fn test_builder_keeps_one_thread() {
        let config = PlatformConfig::default().with_thread_pool_size(0);
        assert_eq!(config.thread_pool_size, 1);
        assert_eq!(config.with_thread_pool_size(6).thread_pool_size, 6);
    }

    #[test]
    fn test_rejects_bad_stack_size() {
        let err = PlatformConfig::from_lookup(lookup_from(&[(WORKER_STACK_SIZE_VAR, "big")]))
            .unwrap_err();
        assert!(err.to_string().contains(WORKER_STACK_SIZE_VAR));
    }
}
