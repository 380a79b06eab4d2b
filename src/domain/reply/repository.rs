use super::entity::{NewReply, Reply};
use crate::domain::shared::errors::DomainError;
use async_trait::async_trait;

#[async_trait]
pub trait ReplyRepository: Send + Sync {
    async fn create(&self, reply: NewReply) -> Result<Reply, DomainError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Reply>, DomainError>;
    async fn update_content(&self, id: i64, content: &str) -> Result<bool, DomainError>;
    async fn delete(&self, id: i64) -> Result<bool, DomainError>;
    /// Reply ids under a comment, oldest first.
    async fn list_by_comment(&self, comment_id: i64) -> Result<Vec<i64>, DomainError>;
}
