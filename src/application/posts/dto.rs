use crate::domain::shared::{ids::{ActorId, TopicId}, pagination::CursorPage};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub content: String,
    /// Staging tokens of previously uploaded images.
    pub images: Vec<String>,
    pub topic_id: Option<TopicId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PostListKind {
    #[default]
    All,
    User,
    Liked,
    Favourited,
    Topic,
}

#[derive(Debug, Clone, Default)]
pub struct PostListQuery {
    pub kind: PostListKind,
    /// Subject of `user`, `liked` and `favourited` lists.
    pub uid: Option<ActorId>,
    pub topic_id: Option<TopicId>,
    pub page: CursorPage,
}
