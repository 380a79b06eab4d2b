use crate::domain::shared::ids::{ActorId, TopicId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Most images a post may carry.
pub const MAX_POST_IMAGES: usize = 9;

/// A published post.
///
/// `images` holds file names relative to the permanent image directory;
/// `like_count` and `favourite_count` mirror the engagement records and are
/// only ever written by the engagement store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: ActorId,
    pub ip_address: Option<String>,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub topic_id: Option<TopicId>,
    pub like_count: i64,
    pub favourite_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub author_id: ActorId,
    pub ip_address: Option<String>,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub topic_id: Option<TopicId>,
}
