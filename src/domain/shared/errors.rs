use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Failures surfaced by the domain and application layers.
///
/// Stores translate driver errors into `StorageUnavailable` (connectivity,
/// timeouts, pool exhaustion) or `InfrastructureError` (everything else).
/// Services turn "not found" and "zero rows affected" outcomes into the
/// engagement-specific variants.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum DomainError {
    #[error("{0} does not exist")]
    TargetNotFound(String),
    #[error("already engaged: {0}")]
    AlreadyEngaged(String),
    #[error("not engaged: {0}")]
    NotEngaged(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
}

impl DomainError {
    /// Whether the failure reflects a client request rather than the server.
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            Self::TargetNotFound(_)
                | Self::AlreadyEngaged(_)
                | Self::NotEngaged(_)
                | Self::ValidationError(_)
        )
    }
}
