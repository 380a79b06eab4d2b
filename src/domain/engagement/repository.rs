use super::entity::{
    EngagementKind, EngagementRecord, ReconcileReport, TargetKind, TargetRef, UpsertOutcome,
};
use crate::domain::shared::{errors::DomainError, ids::ActorId};
use async_trait::async_trait;

/// Persistence for engagement records and the counters derived from them.
///
/// Implementations must keep each mutating call atomic: the record write and
/// every counter adjustment it implies either all land or none do.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// Inserts `record` if absent, first removing the `clear` kind for the
    /// same actor and target when given.
    ///
    /// Fails with `AlreadyEngaged` when the record exists (nothing is
    /// written) and `TargetNotFound` when the target row is gone.
    async fn upsert(
        &self,
        record: EngagementRecord,
        clear: Option<EngagementKind>,
    ) -> Result<UpsertOutcome, DomainError>;

    /// Removes a record; `NotEngaged` when it was absent.
    async fn delete(
        &self,
        actor: ActorId,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<(), DomainError>;

    async fn contains(
        &self,
        actor: ActorId,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<bool, DomainError>;

    /// Current denormalized counter value.
    async fn count_by_target(
        &self,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<i64, DomainError>;

    /// Records held by `actor`, oldest first.
    async fn list_by_actor(
        &self,
        actor: ActorId,
        target_kind: TargetKind,
        kind: EngagementKind,
    ) -> Result<Vec<EngagementRecord>, DomainError>;

    /// Records held on `target`, oldest first.
    async fn list_by_target(
        &self,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<Vec<EngagementRecord>, DomainError>;

    /// Drops every record pointing at `target`. Returns the number removed.
    async fn purge_target(&self, target: TargetRef) -> Result<u64, DomainError>;

    async fn reconcile(&self) -> Result<ReconcileReport, DomainError>;
}

/// Primary-key lookup of engagement targets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExistenceGuard: Send + Sync {
    /// `Ok(false)` when the row is absent; `Err` only for storage failures.
    async fn exists(&self, target: &TargetRef) -> Result<bool, DomainError>;
}
