use crate::{
    application::{engagement::use_case::ToggleService, required_text},
    domain::{
        comment::repository::CommentRepository,
        engagement::entity::{EngagementStatus, TargetRef, UpsertOutcome},
        reply::{
            entity::{NewReply, Reply},
            repository::ReplyRepository,
        },
        shared::{errors::DomainError, ids::ActorId},
    },
};
use std::sync::Arc;
use tracing::{info, instrument};

pub struct ReplyService {
    replies: Arc<dyn ReplyRepository>,
    comments: Arc<dyn CommentRepository>,
    toggles: Arc<ToggleService>,
}

impl ReplyService {
    pub fn new(
        replies: Arc<dyn ReplyRepository>,
        comments: Arc<dyn CommentRepository>,
        toggles: Arc<ToggleService>,
    ) -> Self {
        Self {
            replies,
            comments,
            toggles,
        }
    }

    /// Creates a reply under `comment_id`.
    ///
    /// When `parent_reply_id` is given it must be a reply in the same
    /// comment thread; its author is recorded as the addressee.
    #[instrument(skip(self, username, content))]
    pub async fn create(
        &self,
        author: ActorId,
        username: &str,
        comment_id: i64,
        parent_reply_id: Option<i64>,
        content: &str,
    ) -> Result<Reply, DomainError> {
        let content = required_text("content", content)?;
        if self.comments.find_by_id(comment_id).await?.is_none() {
            return Err(DomainError::TargetNotFound(format!("comment {comment_id}")));
        }

        let parent_reply_uid = match parent_reply_id {
            None => None,
            Some(parent_id) => {
                let parent = self
                    .replies
                    .find_by_id(parent_id)
                    .await?
                    .ok_or_else(|| DomainError::TargetNotFound(format!("reply {parent_id}")))?;
                if parent.comment_id != comment_id {
                    return Err(DomainError::ValidationError(format!(
                        "reply {parent_id} does not belong to comment {comment_id}"
                    )));
                }
                Some(parent.author_id)
            }
        };

        let reply = self
            .replies
            .create(NewReply {
                comment_id,
                parent_reply_id,
                parent_reply_uid,
                author_id: author,
                username: username.to_string(),
                content,
            })
            .await?;
        info!(reply_id = reply.id, "reply created");
        Ok(reply)
    }

    async fn owned(&self, actor: ActorId, id: i64) -> Result<Reply, DomainError> {
        let reply = self.detail(id).await?;
        if reply.author_id != actor {
            return Err(DomainError::Unauthorized);
        }
        Ok(reply)
    }

    pub async fn edit(&self, actor: ActorId, id: i64, content: &str) -> Result<(), DomainError> {
        let content = required_text("content", content)?;
        self.owned(actor, id).await?;
        if !self.replies.update_content(id, &content).await? {
            return Err(DomainError::TargetNotFound(format!("reply {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, actor: ActorId, id: i64) -> Result<(), DomainError> {
        self.owned(actor, id).await?;
        if !self.replies.delete(id).await? {
            return Err(DomainError::TargetNotFound(format!("reply {id}")));
        }
        Ok(())
    }

    pub async fn list(&self, comment_id: i64) -> Result<Vec<i64>, DomainError> {
        if self.comments.find_by_id(comment_id).await?.is_none() {
            return Err(DomainError::TargetNotFound(format!("comment {comment_id}")));
        }
        self.replies.list_by_comment(comment_id).await
    }

    pub async fn detail(&self, id: i64) -> Result<Reply, DomainError> {
        self.replies
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::TargetNotFound(format!("reply {id}")))
    }

    pub async fn user_status(
        &self,
        actor: ActorId,
        id: i64,
    ) -> Result<EngagementStatus, DomainError> {
        self.detail(id).await?;
        self.toggles.status(actor, TargetRef::reply(id)).await
    }

    pub async fn like(&self, actor: ActorId, id: i64) -> Result<UpsertOutcome, DomainError> {
        self.toggles.like(actor, TargetRef::reply(id)).await
    }

    pub async fn unlike(&self, actor: ActorId, id: i64) -> Result<(), DomainError> {
        self.toggles.unlike(actor, TargetRef::reply(id)).await
    }

    pub async fn dislike(&self, actor: ActorId, id: i64) -> Result<UpsertOutcome, DomainError> {
        self.toggles.dislike(actor, TargetRef::reply(id)).await
    }

    pub async fn undislike(&self, actor: ActorId, id: i64) -> Result<(), DomainError> {
        self.toggles.undislike(actor, TargetRef::reply(id)).await
    }
}
