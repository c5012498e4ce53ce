//! Platform errors

use crate::isolate::IsolateId;

/// Errors reported by the platform
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("{0} is not registered with the platform")]
    UnregisteredIsolate(IsolateId),

    #[error("Invalid value {value:?} for {key}")]
    InvalidConfig { key: &'static str, value: String },
}
