pub mod sqlx_comment_repository;
pub mod sqlx_engagement_store;
pub mod sqlx_post_repository;
pub mod sqlx_reply_repository;
pub mod sqlx_target_directory;
pub mod sqlx_topic_repository;
pub mod sqlx_user_repository;

use crate::domain::engagement::entity::{EngagementKind, TargetId, TargetKind};
use sqlx::{Postgres, postgres::PgArguments, query::Query};

/// Table owning rows of the given target kind.
pub(crate) fn table_for(kind: TargetKind) -> &'static str {
    match kind {
        TargetKind::Post => "posts",
        TargetKind::Comment => "comments",
        TargetKind::Reply => "replies",
        TargetKind::Topic => "topics",
        TargetKind::User => "users",
    }
}

/// Denormalized counter column for a supported (target, kind) pair.
pub(crate) fn counter_column(target: TargetKind, kind: EngagementKind) -> Option<&'static str> {
    if !target.supports(kind) {
        return None;
    }
    Some(match kind {
        EngagementKind::Like => "like_count",
        EngagementKind::Dislike => "dislike_count",
        EngagementKind::Favourite => "favourite_count",
        EngagementKind::Follow => "follower_count",
    })
}

/// Binds a target id with the column type of its owning table.
pub(crate) fn bind_target_id<'q>(
    query: Query<'q, Postgres, PgArguments>,
    id: &TargetId,
) -> Query<'q, Postgres, PgArguments> {
    match id {
        TargetId::Numeric(n) => query.bind(*n),
        TargetId::Object(topic) => query.bind(topic.to_hex()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_follow_the_support_matrix() {
        assert_eq!(
            counter_column(TargetKind::Post, EngagementKind::Favourite),
            Some("favourite_count")
        );
        assert_eq!(
            counter_column(TargetKind::User, EngagementKind::Follow),
            Some("follower_count")
        );
        assert_eq!(counter_column(TargetKind::Post, EngagementKind::Dislike), None);
        assert_eq!(counter_column(TargetKind::Topic, EngagementKind::Follow), None);
    }
}
