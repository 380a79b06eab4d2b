use crate::domain::{
    engagement::{
        entity::{
            EngagementCounts, EngagementKind, EngagementRecord, EngagementStatus, TargetId,
            TargetKind, TargetRef, UpsertOutcome,
        },
        repository::{EngagementStore, ExistenceGuard},
    },
    shared::{errors::DomainError, ids::ActorId},
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Engagement state machine.
///
/// Enforces the (target kind, engagement kind) matrix, checks the target
/// exists, and hands the write to the store with the opposing kind to clear.
/// Idempotency is reported, not swallowed: a second engage yields
/// `AlreadyEngaged`, a disengage with nothing to remove yields `NotEngaged`.
pub struct ToggleService {
    guard: Arc<dyn ExistenceGuard>,
    store: Arc<dyn EngagementStore>,
    deadline: Duration,
}

impl ToggleService {
    pub fn new(
        guard: Arc<dyn ExistenceGuard>,
        store: Arc<dyn EngagementStore>,
        deadline: Duration,
    ) -> Self {
        Self {
            guard,
            store,
            deadline,
        }
    }

    async fn with_deadline<T, F>(&self, op: &'static str, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, deadline_ms = self.deadline.as_millis() as u64, "store call timed out");
                Err(DomainError::StorageUnavailable(format!(
                    "{op} timed out after {}ms",
                    self.deadline.as_millis()
                )))
            }
        }
    }

    fn check_supported(target: &TargetRef, kind: EngagementKind) -> Result<(), DomainError> {
        if target.kind.supports(kind) {
            Ok(())
        } else {
            Err(DomainError::ValidationError(format!(
                "{kind} is not supported on {}",
                target.kind
            )))
        }
    }

    async fn ensure_exists(&self, target: &TargetRef) -> Result<(), DomainError> {
        if self.with_deadline("exists", self.guard.exists(target)).await? {
            Ok(())
        } else {
            Err(DomainError::TargetNotFound(target.to_string()))
        }
    }

    #[instrument(skip(self), fields(target = %target))]
    pub async fn engage(
        &self,
        actor: ActorId,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<UpsertOutcome, DomainError> {
        Self::check_supported(&target, kind)?;
        if kind == EngagementKind::Follow && target.id == TargetId::Numeric(actor) {
            return Err(DomainError::ValidationError(
                "users cannot follow themselves".to_string(),
            ));
        }
        self.ensure_exists(&target).await?;

        let record = EngagementRecord::new(actor, target, kind);
        let outcome = self
            .with_deadline("upsert", self.store.upsert(record, kind.opposing()))
            .await?;
        debug!(cleared_opposing = outcome.cleared_opposing, "engagement recorded");
        Ok(outcome)
    }

    #[instrument(skip(self), fields(target = %target))]
    pub async fn disengage(
        &self,
        actor: ActorId,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<(), DomainError> {
        Self::check_supported(&target, kind)?;
        self.ensure_exists(&target).await?;
        self.with_deadline("delete", self.store.delete(actor, target, kind))
            .await?;
        debug!("engagement removed");
        Ok(())
    }

    pub async fn like(&self, actor: ActorId, target: TargetRef) -> Result<UpsertOutcome, DomainError> {
        self.engage(actor, target, EngagementKind::Like).await
    }

    pub async fn unlike(&self, actor: ActorId, target: TargetRef) -> Result<(), DomainError> {
        self.disengage(actor, target, EngagementKind::Like).await
    }

    pub async fn dislike(
        &self,
        actor: ActorId,
        target: TargetRef,
    ) -> Result<UpsertOutcome, DomainError> {
        self.engage(actor, target, EngagementKind::Dislike).await
    }

    pub async fn undislike(&self, actor: ActorId, target: TargetRef) -> Result<(), DomainError> {
        self.disengage(actor, target, EngagementKind::Dislike).await
    }

    pub async fn favourite(
        &self,
        actor: ActorId,
        target: TargetRef,
    ) -> Result<UpsertOutcome, DomainError> {
        self.engage(actor, target, EngagementKind::Favourite).await
    }

    pub async fn unfavourite(&self, actor: ActorId, target: TargetRef) -> Result<(), DomainError> {
        self.disengage(actor, target, EngagementKind::Favourite).await
    }

    pub async fn follow(&self, actor: ActorId, followee: ActorId) -> Result<UpsertOutcome, DomainError> {
        self.engage(actor, TargetRef::user(followee), EngagementKind::Follow)
            .await
    }

    pub async fn unfollow(&self, actor: ActorId, followee: ActorId) -> Result<(), DomainError> {
        self.disengage(actor, TargetRef::user(followee), EngagementKind::Follow)
            .await
    }

    /// Which of the target's supported engagements `actor` holds.
    pub async fn status(
        &self,
        actor: ActorId,
        target: TargetRef,
    ) -> Result<EngagementStatus, DomainError> {
        let mut status = EngagementStatus::default();
        for kind in target.kind.supported() {
            let held = self
                .with_deadline("contains", self.store.contains(actor, target, *kind))
                .await?;
            status.set(*kind, held);
        }
        Ok(status)
    }

    pub async fn contains(
        &self,
        actor: ActorId,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<bool, DomainError> {
        Self::check_supported(&target, kind)?;
        self.with_deadline("contains", self.store.contains(actor, target, kind))
            .await
    }

    pub async fn count(&self, target: TargetRef, kind: EngagementKind) -> Result<i64, DomainError> {
        Self::check_supported(&target, kind)?;
        self.with_deadline("count", self.store.count_by_target(target, kind))
            .await
    }

    /// Denormalized counters for every kind the target supports.
    pub async fn counts(&self, target: TargetRef) -> Result<EngagementCounts, DomainError> {
        self.ensure_exists(&target).await?;
        let mut counts = EngagementCounts::default();
        for kind in target.kind.supported() {
            let value = self
                .with_deadline("count", self.store.count_by_target(target, *kind))
                .await?;
            counts.set(*kind, value);
        }
        Ok(counts)
    }

    /// Records held by `actor`, oldest first.
    pub async fn records_by_actor(
        &self,
        actor: ActorId,
        target_kind: TargetKind,
        kind: EngagementKind,
    ) -> Result<Vec<EngagementRecord>, DomainError> {
        if !target_kind.supports(kind) {
            return Err(DomainError::ValidationError(format!(
                "{kind} is not supported on {target_kind}"
            )));
        }
        self.with_deadline(
            "list_by_actor",
            self.store.list_by_actor(actor, target_kind, kind),
        )
        .await
    }

    /// Records held on `target`, oldest first.
    pub async fn records_by_target(
        &self,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<Vec<EngagementRecord>, DomainError> {
        Self::check_supported(&target, kind)?;
        self.with_deadline("list_by_target", self.store.list_by_target(target, kind))
            .await
    }
}
