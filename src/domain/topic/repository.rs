use super::entity::{NewTopic, Topic};
use crate::domain::shared::{errors::DomainError, ids::TopicId};
use async_trait::async_trait;

#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// `ValidationError` when the name is already taken.
    async fn create(&self, topic: NewTopic) -> Result<Topic, DomainError>;
    async fn find_by_id(&self, id: TopicId) -> Result<Option<Topic>, DomainError>;
    /// Newest first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<Topic>, DomainError>;
    /// Highest like count first.
    async fn list_hot(&self, limit: i64) -> Result<Vec<Topic>, DomainError>;
    /// Deletes the topic and its engagement records, and detaches its posts.
    async fn delete(&self, id: TopicId) -> Result<bool, DomainError>;
}
