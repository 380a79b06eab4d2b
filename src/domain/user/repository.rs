use super::entity::{ProfileUpdate, User};
use crate::domain::shared::{errors::DomainError, ids::ActorId};
use async_trait::async_trait;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// `ValidationError` when the username is already registered.
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, DomainError>;
    async fn find_by_id(&self, id: ActorId) -> Result<Option<User>, DomainError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError>;
    async fn update_password(&self, id: ActorId, password_hash: &str) -> Result<(), DomainError>;
    async fn update_profile(&self, id: ActorId, update: ProfileUpdate)
    -> Result<User, DomainError>;
    /// Points the user at a new avatar file and returns the one it replaced.
    async fn replace_avatar(&self, id: ActorId, avatar: &str) -> Result<String, DomainError>;
}
