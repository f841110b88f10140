use super::{Handle, IndexDomain, ValueDomain};
use crate::index::Granularity;

/// Errors raised while validating a registry call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown handle: {0}")]
    UnknownHandle(Handle),
    #[error("Index domain mismatch: expected {expected}, got {actual}")]
    IndexDomainMismatch {
        expected: IndexDomain,
        actual: IndexDomain,
    },
    #[error("Value domain mismatch on {handle}: expected {expected}, got {actual}")]
    ValueDomainMismatch {
        handle: Handle,
        expected: ValueDomain,
        actual: ValueDomain,
    },
    #[error("Granularity mismatch: {expected} vs {actual}")]
    GranularityMismatch {
        expected: Granularity,
        actual: Granularity,
    },
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParam { name: &'static str, reason: String },
    #[error("Handle {0} is not a writable source")]
    NotWritable(Handle),
    #[error("Out-of-order write to {handle}: {reason}")]
    OutOfOrderWrite { handle: Handle, reason: String },
}

impl RegistryError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        RegistryError::InvalidParam {
            name,
            reason: reason.into(),
        }
    }
}
