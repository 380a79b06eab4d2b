use super::entity::{NewPost, Post};
use crate::domain::shared::{
    errors::DomainError,
    ids::{ActorId, TopicId},
    pagination::CursorPage,
};
use async_trait::async_trait;

/// List methods return post ids, newest first, honouring the cursor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: NewPost) -> Result<Post, DomainError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, DomainError>;
    async fn list_recent(&self, page: CursorPage) -> Result<Vec<i64>, DomainError>;
    async fn list_by_author(
        &self,
        author: ActorId,
        page: CursorPage,
    ) -> Result<Vec<i64>, DomainError>;
    async fn list_by_topic(
        &self,
        topic: TopicId,
        page: CursorPage,
    ) -> Result<Vec<i64>, DomainError>;
    async fn list_by_authors(
        &self,
        authors: &[ActorId],
        page: CursorPage,
    ) -> Result<Vec<i64>, DomainError>;
    async fn count_by_topic(&self, topic: TopicId) -> Result<i64, DomainError>;
    /// Deletes the post together with its comments, replies and every
    /// engagement record pointing at any of them. `false` if it was absent.
    async fn delete(&self, id: i64) -> Result<bool, DomainError>;
}
