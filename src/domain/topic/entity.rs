use crate::domain::shared::ids::{ActorId, TopicId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    pub name: String,
    pub description: String,
    pub creator_id: ActorId,
    pub like_count: i64,
    pub dislike_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTopic {
    pub id: TopicId,
    pub name: String,
    pub description: String,
    pub creator_id: ActorId,
}
