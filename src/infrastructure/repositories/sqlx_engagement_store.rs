use super::{bind_target_id, counter_column, table_for};
use crate::{
    domain::{
        engagement::{
            entity::{
                EngagementKind, EngagementRecord, ReconcileReport, TargetKind, TargetRef,
                UpsertOutcome,
            },
            repository::EngagementStore,
        },
        shared::{errors::DomainError, ids::ActorId},
    },
    infrastructure::database::map_sqlx,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{debug, info, instrument};

#[derive(FromRow)]
struct EngagementRow {
    actor_id: i64,
    target_kind: String,
    target_key: String,
    kind: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<EngagementRow> for EngagementRecord {
    type Error = DomainError;

    fn try_from(r: EngagementRow) -> Result<Self, Self::Error> {
        let target_kind: TargetKind = r.target_kind.parse()?;
        Ok(Self {
            actor: r.actor_id,
            target: TargetRef::parse(target_kind, &r.target_key)?,
            kind: r.kind.parse()?,
            created_at: r.created_at,
        })
    }
}

/// Engagement records in the `engagements` table, counters on the target rows.
///
/// Each mutation runs in one transaction that first locks the target row, so
/// toggles on one target are serialized and the opposing-kind clear always
/// sees the other side's committed record.
pub struct SqlxEngagementStore {
    pool: PgPool,
}

impl SqlxEngagementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Takes the row lock on the target, plus the actor's user row for
    /// follows (in id order). Returns whether the target row exists.
    async fn lock_target(
        tx: &mut Transaction<'_, Postgres>,
        actor: ActorId,
        target: &TargetRef,
        kind: EngagementKind,
    ) -> Result<bool, DomainError> {
        if kind == EngagementKind::Follow {
            let Some(followed) = target.id.as_numeric() else {
                return Ok(false);
            };
            let locked: Vec<i64> = sqlx::query_scalar(
                "SELECT id FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE",
            )
            .bind(vec![actor, followed])
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx)?;
            return Ok(locked.contains(&followed));
        }

        let sql = format!(
            "SELECT 1 FROM {table} WHERE id = $1 FOR UPDATE",
            table = table_for(target.kind)
        );
        let row = bind_target_id(sqlx::query(&sql), &target.id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx)?;
        Ok(row.is_some())
    }

    /// Adds `delta` to the counter for `kind` on `target`, never going below
    /// zero. Returns whether the target row exists.
    async fn bump(
        tx: &mut Transaction<'_, Postgres>,
        target: &TargetRef,
        kind: EngagementKind,
        delta: i64,
    ) -> Result<bool, DomainError> {
        let column = counter_column(target.kind, kind).ok_or_else(|| {
            DomainError::ValidationError(format!("{kind} is not supported on {}", target.kind))
        })?;
        let sql = format!(
            "UPDATE {table} SET {column} = GREATEST({column} + $1, 0) WHERE id = $2",
            table = table_for(target.kind)
        );
        let affected = bind_target_id(sqlx::query(&sql).bind(delta), &target.id)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx)?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn bump_following(
        tx: &mut Transaction<'_, Postgres>,
        actor: ActorId,
        delta: i64,
    ) -> Result<(), DomainError> {
        sqlx::query(
            "UPDATE users SET following_count = GREATEST(following_count + $1, 0) WHERE id = $2",
        )
        .bind(delta)
        .bind(actor)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx)?;
        Ok(())
    }

    async fn remove_record(
        tx: &mut Transaction<'_, Postgres>,
        actor: ActorId,
        target: &TargetRef,
        kind: EngagementKind,
    ) -> Result<bool, DomainError> {
        let removed = sqlx::query(
            "DELETE FROM engagements
             WHERE actor_id = $1 AND target_kind = $2 AND target_key = $3 AND kind = $4",
        )
        .bind(actor)
        .bind(target.kind.as_str())
        .bind(target.key())
        .bind(kind.as_str())
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx)?
        .rows_affected();
        Ok(removed > 0)
    }
}

#[async_trait]
impl EngagementStore for SqlxEngagementStore {
    #[instrument(skip(self, record), fields(actor = record.actor, target = %record.target, kind = %record.kind))]
    async fn upsert(
        &self,
        record: EngagementRecord,
        clear: Option<EngagementKind>,
    ) -> Result<UpsertOutcome, DomainError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let mut outcome = UpsertOutcome::default();

        if !Self::lock_target(&mut tx, record.actor, &record.target, record.kind).await? {
            tx.rollback().await.map_err(map_sqlx)?;
            return Err(DomainError::TargetNotFound(record.target.to_string()));
        }

        if let Some(opposing) = clear {
            if Self::remove_record(&mut tx, record.actor, &record.target, opposing).await? {
                Self::bump(&mut tx, &record.target, opposing, -1).await?;
                outcome.cleared_opposing = true;
            }
        }

        let inserted = sqlx::query(
            "INSERT INTO engagements (actor_id, target_kind, target_key, kind, created_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT DO NOTHING",
        )
        .bind(record.actor)
        .bind(record.target.kind.as_str())
        .bind(record.target.key())
        .bind(record.kind.as_str())
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?
        .rows_affected();
        if inserted == 0 {
            tx.rollback().await.map_err(map_sqlx)?;
            return Err(DomainError::AlreadyEngaged(format!(
                "{} already on {}",
                record.kind, record.target
            )));
        }

        if !Self::bump(&mut tx, &record.target, record.kind, 1).await? {
            tx.rollback().await.map_err(map_sqlx)?;
            return Err(DomainError::TargetNotFound(record.target.to_string()));
        }
        if record.kind == EngagementKind::Follow {
            Self::bump_following(&mut tx, record.actor, 1).await?;
        }

        tx.commit().await.map_err(map_sqlx)?;
        debug!(cleared_opposing = outcome.cleared_opposing, "engagement recorded");
        Ok(outcome)
    }

    #[instrument(skip(self), fields(target = %target, kind = %kind))]
    async fn delete(
        &self,
        actor: ActorId,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        Self::lock_target(&mut tx, actor, &target, kind).await?;
        if !Self::remove_record(&mut tx, actor, &target, kind).await? {
            tx.rollback().await.map_err(map_sqlx)?;
            return Err(DomainError::NotEngaged(format!("{kind} not on {target}")));
        }
        Self::bump(&mut tx, &target, kind, -1).await?;
        if kind == EngagementKind::Follow {
            Self::bump_following(&mut tx, actor, -1).await?;
        }
        tx.commit().await.map_err(map_sqlx)?;
        Ok(())
    }

    async fn contains(
        &self,
        actor: ActorId,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM engagements
                WHERE actor_id = $1 AND target_kind = $2 AND target_key = $3 AND kind = $4
             )",
        )
        .bind(actor)
        .bind(target.kind.as_str())
        .bind(target.key())
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn count_by_target(
        &self,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<i64, DomainError> {
        let column = counter_column(target.kind, kind).ok_or_else(|| {
            DomainError::ValidationError(format!("{} has no {kind} counter", target.kind))
        })?;
        let sql = format!(
            "SELECT {column} FROM {table} WHERE id = $1",
            table = table_for(target.kind)
        );
        let row = bind_target_id(sqlx::query(&sql), &target.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .ok_or_else(|| DomainError::TargetNotFound(target.to_string()))?;
        row.try_get::<i64, _>(0).map_err(map_sqlx)
    }

    async fn list_by_actor(
        &self,
        actor: ActorId,
        target_kind: TargetKind,
        kind: EngagementKind,
    ) -> Result<Vec<EngagementRecord>, DomainError> {
        let rows = sqlx::query_as::<_, EngagementRow>(
            "SELECT actor_id, target_kind, target_key, kind, created_at
             FROM engagements
             WHERE actor_id = $1 AND target_kind = $2 AND kind = $3
             ORDER BY seq ASC",
        )
        .bind(actor)
        .bind(target_kind.as_str())
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(EngagementRecord::try_from).collect()
    }

    async fn list_by_target(
        &self,
        target: TargetRef,
        kind: EngagementKind,
    ) -> Result<Vec<EngagementRecord>, DomainError> {
        let rows = sqlx::query_as::<_, EngagementRow>(
            "SELECT actor_id, target_kind, target_key, kind, created_at
             FROM engagements
             WHERE target_kind = $1 AND target_key = $2 AND kind = $3
             ORDER BY seq ASC",
        )
        .bind(target.kind.as_str())
        .bind(target.key())
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(EngagementRecord::try_from).collect()
    }

    async fn purge_target(&self, target: TargetRef) -> Result<u64, DomainError> {
        let removed = sqlx::query("DELETE FROM engagements WHERE target_kind = $1 AND target_key = $2")
            .bind(target.kind.as_str())
            .bind(target.key())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?
            .rows_affected();
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn reconcile(&self) -> Result<ReconcileReport, DomainError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        let mut report = ReconcileReport::default();

        for target_kind in TargetKind::ALL {
            let table = table_for(target_kind);
            let orphan_sql = format!(
                "DELETE FROM engagements e
                 WHERE e.target_kind = $1
                   AND NOT EXISTS (SELECT 1 FROM {table} t WHERE t.id::text = e.target_key)"
            );
            report.orphans_removed += sqlx::query(&orphan_sql)
                .bind(target_kind.as_str())
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx)?
                .rows_affected();
        }

        for target_kind in TargetKind::ALL {
            let table = table_for(target_kind);
            for &kind in target_kind.supported() {
                let Some(column) = counter_column(target_kind, kind) else {
                    continue;
                };
                let recount_sql = format!(
                    "UPDATE {table} t SET {column} = c.n
                     FROM (
                        SELECT t2.id, COUNT(e.actor_id) AS n
                        FROM {table} t2
                        LEFT JOIN engagements e
                          ON e.target_kind = $1 AND e.kind = $2 AND e.target_key = t2.id::text
                        GROUP BY t2.id
                     ) c
                     WHERE t.id = c.id AND t.{column} <> c.n"
                );
                report.counters_fixed += sqlx::query(&recount_sql)
                    .bind(target_kind.as_str())
                    .bind(kind.as_str())
                    .execute(&mut *tx)
                    .await
                    .map_err(map_sqlx)?
                    .rows_affected();
            }
        }

        report.counters_fixed += sqlx::query(
            "UPDATE users u SET following_count = c.n
             FROM (
                SELECT u2.id, COUNT(e.target_key) AS n
                FROM users u2
                LEFT JOIN engagements e ON e.actor_id = u2.id AND e.kind = 'follow'
                GROUP BY u2.id
             ) c
             WHERE u.id = c.id AND u.following_count <> c.n",
        )
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?
        .rows_affected();

        tx.commit().await.map_err(map_sqlx)?;
        if report != ReconcileReport::default() {
            info!(
                orphans_removed = report.orphans_removed,
                counters_fixed = report.counters_fixed,
                "engagement state reconciled"
            );
        }
        Ok(report)
    }
}
