use super::dto::TopicDetail;
use crate::{
    application::{engagement::use_case::ToggleService, required_text},
    domain::{
        engagement::entity::{EngagementStatus, TargetRef, UpsertOutcome},
        post::repository::PostRepository,
        shared::{
            errors::DomainError,
            ids::{ActorId, TopicId},
        },
        topic::{
            entity::{NewTopic, Topic},
            repository::TopicRepository,
        },
    },
};
use std::sync::Arc;
use tracing::{info, instrument};

pub const MAX_TOPIC_NAME_LEN: usize = 32;
pub const MAX_HOT_TOPICS: i64 = 50;

pub struct TopicService {
    topics: Arc<dyn TopicRepository>,
    posts: Arc<dyn PostRepository>,
    toggles: Arc<ToggleService>,
}

impl TopicService {
    pub fn new(
        topics: Arc<dyn TopicRepository>,
        posts: Arc<dyn PostRepository>,
        toggles: Arc<ToggleService>,
    ) -> Self {
        Self {
            topics,
            posts,
            toggles,
        }
    }

    #[instrument(skip(self, description))]
    pub async fn create(
        &self,
        creator: ActorId,
        name: &str,
        description: &str,
    ) -> Result<Topic, DomainError> {
        let name = required_text("name", name)?;
        if name.chars().count() > MAX_TOPIC_NAME_LEN {
            return Err(DomainError::ValidationError(format!(
                "topic name is limited to {MAX_TOPIC_NAME_LEN} characters"
            )));
        }
        let topic = self
            .topics
            .create(NewTopic {
                id: TopicId::generate(),
                name,
                description: description.trim().to_string(),
                creator_id: creator,
            })
            .await?;
        info!(topic_id = %topic.id, "topic created");
        Ok(topic)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, actor: ActorId, id: TopicId) -> Result<(), DomainError> {
        let topic = self.find(id).await?;
        if topic.creator_id != actor {
            return Err(DomainError::Unauthorized);
        }
        if !self.topics.delete(id).await? {
            return Err(DomainError::TargetNotFound(format!("topic {id}")));
        }
        Ok(())
    }

    async fn find(&self, id: TopicId) -> Result<Topic, DomainError> {
        self.topics
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::TargetNotFound(format!("topic {id}")))
    }

    pub async fn detail(&self, id: TopicId) -> Result<TopicDetail, DomainError> {
        let topic = self.find(id).await?;
        let post_count = self.posts.count_by_topic(id).await?;
        Ok(TopicDetail { topic, post_count })
    }

    /// Newest topics first.
    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<Topic>, DomainError> {
        self.topics.list_recent(clamp_limit(limit)).await
    }

    /// Most liked topics first.
    pub async fn hot(&self, limit: Option<i64>) -> Result<Vec<Topic>, DomainError> {
        self.topics.list_hot(clamp_limit(limit)).await
    }

    pub async fn user_status(
        &self,
        actor: ActorId,
        id: TopicId,
    ) -> Result<EngagementStatus, DomainError> {
        self.find(id).await?;
        self.toggles.status(actor, TargetRef::topic(id)).await
    }

    pub async fn like(&self, actor: ActorId, id: TopicId) -> Result<UpsertOutcome, DomainError> {
        self.toggles.like(actor, TargetRef::topic(id)).await
    }

    pub async fn unlike(&self, actor: ActorId, id: TopicId) -> Result<(), DomainError> {
        self.toggles.unlike(actor, TargetRef::topic(id)).await
    }

    pub async fn dislike(&self, actor: ActorId, id: TopicId) -> Result<UpsertOutcome, DomainError> {
        self.toggles.dislike(actor, TargetRef::topic(id)).await
    }

    pub async fn undislike(&self, actor: ActorId, id: TopicId) -> Result<(), DomainError> {
        self.toggles.undislike(actor, TargetRef::topic(id)).await
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(l) if l > 0 => l.min(MAX_HOT_TOPICS),
        _ => MAX_HOT_TOPICS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::MemoryBackend;
    use std::time::Duration;

    fn service() -> TopicService {
        let backend = Arc::new(MemoryBackend::default());
        let toggles = Arc::new(ToggleService::new(
            backend.clone(),
            backend.clone(),
            Duration::from_secs(2),
        ));
        TopicService::new(backend.clone(), backend, toggles)
    }

    #[tokio::test]
    async fn names_are_unique() {
        let service = service();
        service.create(1, "rust", "").await.unwrap();
        assert!(matches!(
            service.create(2, "rust", "again").await,
            Err(DomainError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn hot_orders_by_likes() {
        let service = service();
        let calm = service.create(1, "calm", "").await.unwrap().id;
        let busy = service.create(1, "busy", "").await.unwrap().id;
        service.like(7, busy).await.unwrap();
        service.like(8, busy).await.unwrap();
        service.like(7, calm).await.unwrap();

        let hot: Vec<TopicId> = service.hot(Some(10)).await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(hot, vec![busy, calm]);
    }

    #[tokio::test]
    async fn only_the_creator_deletes() {
        let service = service();
        let id = service.create(1, "mine", "").await.unwrap().id;
        assert_eq!(service.delete(2, id).await, Err(DomainError::Unauthorized));
        service.delete(1, id).await.unwrap();
        assert!(matches!(
            service.detail(id).await,
            Err(DomainError::TargetNotFound(_))
        ));
    }

    #[test]
    fn limits_are_capped() {
        assert_eq!(clamp_limit(None), 50);
        assert_eq!(clamp_limit(Some(500)), 50);
        assert_eq!(clamp_limit(Some(5)), 5);
    }
}
