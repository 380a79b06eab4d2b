use super::entity::{Comment, NewComment};
use crate::domain::shared::errors::DomainError;
use async_trait::async_trait;

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, comment: NewComment) -> Result<Comment, DomainError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, DomainError>;
    async fn update_content(&self, id: i64, content: &str) -> Result<bool, DomainError>;
    /// Removes the comment, its replies and their engagement records.
    async fn delete(&self, id: i64) -> Result<bool, DomainError>;
    /// Comment ids under a post, newest first.
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<i64>, DomainError>;
}
