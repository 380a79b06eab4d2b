use crate::{
    domain::{
        shared::{errors::DomainError, ids::TopicId},
        topic::{
            entity::{NewTopic, Topic},
            repository::TopicRepository,
        },
    },
    infrastructure::database::{is_unique_violation, map_sqlx},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

const TOPIC_COLUMNS: &str =
    "id, name, description, creator_id, like_count, dislike_count, created_at";

#[derive(FromRow)]
struct TopicRow {
    id: String,
    name: String,
    description: String,
    creator_id: i64,
    like_count: i64,
    dislike_count: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<TopicRow> for Topic {
    type Error = DomainError;

    fn try_from(r: TopicRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TopicId::parse_hex(&r.id)?,
            name: r.name,
            description: r.description,
            creator_id: r.creator_id,
            like_count: r.like_count,
            dislike_count: r.dislike_count,
            created_at: r.created_at,
        })
    }
}

pub struct SqlxTopicRepository {
    pool: PgPool,
}

impl SqlxTopicRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_ordered(&self, order_by: &str, limit: i64) -> Result<Vec<Topic>, DomainError> {
        let rows = sqlx::query_as::<_, TopicRow>(&format!(
            "SELECT {TOPIC_COLUMNS} FROM topics ORDER BY {order_by} LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;
        rows.into_iter().map(Topic::try_from).collect()
    }
}

#[async_trait]
impl TopicRepository for SqlxTopicRepository {
    async fn create(&self, topic: NewTopic) -> Result<Topic, DomainError> {
        // created_at comes from the id so ordering by either agrees
        let row = sqlx::query_as::<_, TopicRow>(&format!(
            "INSERT INTO topics (id, name, description, creator_id, created_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {TOPIC_COLUMNS}"
        ))
        .bind(topic.id.to_hex())
        .bind(&topic.name)
        .bind(&topic.description)
        .bind(topic.creator_id)
        .bind(topic.id.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DomainError::ValidationError(format!("topic {} already exists", topic.name))
            } else {
                map_sqlx(e)
            }
        })?;
        row.try_into()
    }

    async fn find_by_id(&self, id: TopicId) -> Result<Option<Topic>, DomainError> {
        let row = sqlx::query_as::<_, TopicRow>(&format!(
            "SELECT {TOPIC_COLUMNS} FROM topics WHERE id = $1"
        ))
        .bind(id.to_hex())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(Topic::try_from).transpose()
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Topic>, DomainError> {
        self.fetch_ordered("created_at DESC, id DESC", limit).await
    }

    async fn list_hot(&self, limit: i64) -> Result<Vec<Topic>, DomainError> {
        self.fetch_ordered("like_count DESC, created_at DESC", limit)
            .await
    }

    async fn delete(&self, id: TopicId) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        sqlx::query("DELETE FROM engagements WHERE target_kind = 'topic' AND target_key = $1")
            .bind(id.to_hex())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        // posts keep existing with topic_id set to NULL by the foreign key
        let deleted = sqlx::query("DELETE FROM topics WHERE id = $1")
            .bind(id.to_hex())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await.map_err(map_sqlx)?;
            return Ok(false);
        }
        tx.commit().await.map_err(map_sqlx)?;
        Ok(true)
    }
}
