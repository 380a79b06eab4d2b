use crate::{
    application::{engagement::use_case::ToggleService, required_text},
    domain::{
        comment::{
            entity::{Comment, NewComment},
            repository::CommentRepository,
        },
        engagement::entity::{EngagementStatus, TargetRef, UpsertOutcome},
        post::repository::PostRepository,
        shared::{errors::DomainError, ids::ActorId},
    },
};
use std::sync::Arc;
use tracing::{info, instrument};

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    toggles: Arc<ToggleService>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        toggles: Arc<ToggleService>,
    ) -> Self {
        Self {
            comments,
            posts,
            toggles,
        }
    }

    async fn ensure_post(&self, post_id: i64) -> Result<(), DomainError> {
        match self.posts.find_by_id(post_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::TargetNotFound(format!("post {post_id}"))),
        }
    }

    /// Loads a comment and checks `actor` wrote it.
    async fn owned(&self, actor: ActorId, id: i64) -> Result<Comment, DomainError> {
        let comment = self.detail(id).await?;
        if comment.author_id != actor {
            return Err(DomainError::Unauthorized);
        }
        Ok(comment)
    }

    #[instrument(skip(self, username, content))]
    pub async fn create(
        &self,
        author: ActorId,
        username: &str,
        post_id: i64,
        content: &str,
    ) -> Result<Comment, DomainError> {
        let content = required_text("content", content)?;
        self.ensure_post(post_id).await?;
        let comment = self
            .comments
            .create(NewComment {
                post_id,
                author_id: author,
                username: username.to_string(),
                content,
            })
            .await?;
        info!(comment_id = comment.id, "comment created");
        Ok(comment)
    }

    pub async fn edit(&self, actor: ActorId, id: i64, content: &str) -> Result<(), DomainError> {
        let content = required_text("content", content)?;
        self.owned(actor, id).await?;
        if !self.comments.update_content(id, &content).await? {
            return Err(DomainError::TargetNotFound(format!("comment {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, actor: ActorId, id: i64) -> Result<(), DomainError> {
        self.owned(actor, id).await?;
        if !self.comments.delete(id).await? {
            return Err(DomainError::TargetNotFound(format!("comment {id}")));
        }
        info!(comment_id = id, "comment deleted");
        Ok(())
    }

    /// Comment ids under a post, newest first.
    pub async fn list(&self, post_id: i64) -> Result<Vec<i64>, DomainError> {
        self.ensure_post(post_id).await?;
        self.comments.list_by_post(post_id).await
    }

    pub async fn detail(&self, id: i64) -> Result<Comment, DomainError> {
        self.comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::TargetNotFound(format!("comment {id}")))
    }

    pub async fn user_status(
        &self,
        actor: ActorId,
        id: i64,
    ) -> Result<EngagementStatus, DomainError> {
        self.detail(id).await?;
        self.toggles.status(actor, TargetRef::comment(id)).await
    }

    pub async fn like(&self, actor: ActorId, id: i64) -> Result<UpsertOutcome, DomainError> {
        self.toggles.like(actor, TargetRef::comment(id)).await
    }

    pub async fn unlike(&self, actor: ActorId, id: i64) -> Result<(), DomainError> {
        self.toggles.unlike(actor, TargetRef::comment(id)).await
    }

    pub async fn dislike(&self, actor: ActorId, id: i64) -> Result<UpsertOutcome, DomainError> {
        self.toggles.dislike(actor, TargetRef::comment(id)).await
    }

    pub async fn undislike(&self, actor: ActorId, id: i64) -> Result<(), DomainError> {
        self.toggles.undislike(actor, TargetRef::comment(id)).await
    }
}
