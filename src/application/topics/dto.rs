use crate::domain::topic::entity::Topic;

/// A topic with the number of posts filed under it.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicDetail {
    pub topic: Topic,
    pub post_count: i64,
}
