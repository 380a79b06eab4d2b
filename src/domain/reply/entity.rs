use crate::domain::shared::ids::ActorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reply to a comment, optionally answering another reply in the same
/// thread. `parent_reply_uid` records the author being answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: i64,
    pub comment_id: i64,
    pub parent_reply_id: Option<i64>,
    pub parent_reply_uid: Option<ActorId>,
    pub author_id: ActorId,
    pub username: String,
    pub content: String,
    pub like_count: i64,
    pub dislike_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReply {
    pub comment_id: i64,
    pub parent_reply_id: Option<i64>,
    pub parent_reply_uid: Option<ActorId>,
    pub author_id: ActorId,
    pub username: String,
    pub content: String,
}
