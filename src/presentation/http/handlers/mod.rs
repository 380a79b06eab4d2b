pub mod auth;
pub mod comments;
pub mod follows;
pub mod health;
pub mod posts;
pub mod replies;
pub mod search;
pub mod topics;

use crate::domain::shared::{errors::DomainError, ids::TopicId};

/// Parses a 24-char hex topic id from request input.
pub(crate) fn parse_topic_id(raw: &str) -> Result<TopicId, DomainError> {
    TopicId::parse_hex(raw.trim())
        .map_err(|_| DomainError::ValidationError(format!("invalid topic id: {raw}")))
}
