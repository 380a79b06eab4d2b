pub mod pool;

use crate::domain::shared::errors::DomainError;

/// Maps a driver error into the domain.
///
/// Connection loss and pool exhaustion become `StorageUnavailable`; anything
/// else is an `InfrastructureError`.
pub(crate) fn map_sqlx(e: sqlx::Error) -> DomainError {
    match &e {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => DomainError::StorageUnavailable(e.to_string()),
        _ => DomainError::InfrastructureError(e.to_string()),
    }
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
