pub mod comments;
pub mod engagement;
pub mod follows;
pub mod posts;
pub mod replies;
pub mod topics;
pub mod users;

use crate::domain::shared::errors::DomainError;

/// Maps a collaborator failure (cache, filesystem, HTTP) into the domain.
pub(crate) fn infra(e: anyhow::Error) -> DomainError {
    DomainError::InfrastructureError(e.to_string())
}

/// Trims and rejects empty text fields.
pub(crate) fn required_text(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::ValidationError(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}
