use super::dto::FollowCounts;
use crate::{
    application::engagement::use_case::ToggleService,
    domain::{
        engagement::entity::{EngagementKind, TargetKind, TargetRef, UpsertOutcome},
        shared::{errors::DomainError, ids::ActorId, pagination::reverse_chronological},
        user::repository::UserRepository,
    },
};
use std::sync::Arc;

/// Follow relationships between users, stored as `Follow` engagements
/// targeting the followee.
pub struct FollowService {
    users: Arc<dyn UserRepository>,
    toggles: Arc<ToggleService>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UserRepository>, toggles: Arc<ToggleService>) -> Self {
        Self { users, toggles }
    }

    pub async fn follow(&self, actor: ActorId, followee: ActorId) -> Result<UpsertOutcome, DomainError> {
        self.toggles.follow(actor, followee).await
    }

    pub async fn unfollow(&self, actor: ActorId, followee: ActorId) -> Result<(), DomainError> {
        self.toggles.unfollow(actor, followee).await
    }

    pub async fn is_following(&self, actor: ActorId, followee: ActorId) -> Result<bool, DomainError> {
        self.toggles
            .contains(actor, TargetRef::user(followee), EngagementKind::Follow)
            .await
    }

    /// Users `uid` follows, most recent first.
    pub async fn following(&self, uid: ActorId) -> Result<Vec<ActorId>, DomainError> {
        let ids: Vec<ActorId> = self
            .toggles
            .records_by_actor(uid, TargetKind::User, EngagementKind::Follow)
            .await?
            .iter()
            .filter_map(|r| r.target.id.as_numeric())
            .collect();
        Ok(reverse_chronological(ids))
    }

    /// Users following `uid`, most recent first.
    pub async fn followers(&self, uid: ActorId) -> Result<Vec<ActorId>, DomainError> {
        let ids: Vec<ActorId> = self
            .toggles
            .records_by_target(TargetRef::user(uid), EngagementKind::Follow)
            .await?
            .iter()
            .map(|r| r.actor)
            .collect();
        Ok(reverse_chronological(ids))
    }

    pub async fn counts(&self, uid: ActorId) -> Result<FollowCounts, DomainError> {
        let user = self
            .users
            .find_by_id(uid)
            .await?
            .ok_or_else(|| DomainError::TargetNotFound(format!("user {uid}")))?;
        Ok(FollowCounts {
            followers: user.follower_count,
            following: user.following_count,
        })
    }
}
