use crate::domain::shared::ids::ActorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Avatar every account starts with; never queued for deletion.
pub const DEFAULT_AVATAR: &str = "vanilla.webp";

pub const MAX_NICKNAME_CHARS: usize = 32;
pub const MAX_GENDER_CHARS: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: ActorId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub nickname: String,
    /// Unix seconds.
    pub birth: Option<i64>,
    pub gender: String,
    /// File name under the avatar directory.
    pub avatar: String,
    pub follower_count: i64,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields to overwrite; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub nickname: Option<String>,
    pub birth: Option<i64>,
    pub gender: Option<String>,
}
