use crate::{
    domain::{
        reply::{
            entity::{NewReply, Reply},
            repository::ReplyRepository,
        },
        shared::errors::DomainError,
    },
    infrastructure::database::map_sqlx,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

const REPLY_COLUMNS: &str = "id, comment_id, parent_reply_id, parent_reply_uid, author_id, \
                             username, content, like_count, dislike_count, created_at, updated_at";

#[derive(FromRow)]
struct ReplyRow {
    id: i64,
    comment_id: i64,
    parent_reply_id: Option<i64>,
    parent_reply_uid: Option<i64>,
    author_id: i64,
    username: String,
    content: String,
    like_count: i64,
    dislike_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReplyRow> for Reply {
    fn from(r: ReplyRow) -> Self {
        Self {
            id: r.id,
            comment_id: r.comment_id,
            parent_reply_id: r.parent_reply_id,
            parent_reply_uid: r.parent_reply_uid,
            author_id: r.author_id,
            username: r.username,
            content: r.content,
            like_count: r.like_count,
            dislike_count: r.dislike_count,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub struct SqlxReplyRepository {
    pool: PgPool,
}

impl SqlxReplyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReplyRepository for SqlxReplyRepository {
    async fn create(&self, reply: NewReply) -> Result<Reply, DomainError> {
        let row = sqlx::query_as::<_, ReplyRow>(&format!(
            "INSERT INTO replies (comment_id, parent_reply_id, parent_reply_uid, author_id, username, content)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {REPLY_COLUMNS}"
        ))
        .bind(reply.comment_id)
        .bind(reply.parent_reply_id)
        .bind(reply.parent_reply_uid)
        .bind(reply.author_id)
        .bind(&reply.username)
        .bind(&reply.content)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Reply>, DomainError> {
        let row = sqlx::query_as::<_, ReplyRow>(&format!(
            "SELECT {REPLY_COLUMNS} FROM replies WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<bool, DomainError> {
        let updated = sqlx::query("UPDATE replies SET content = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(content)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?
            .rows_affected();
        Ok(updated > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        sqlx::query("DELETE FROM engagements WHERE target_kind = 'reply' AND target_key = $1::text")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        let deleted = sqlx::query("DELETE FROM replies WHERE id = $1")
            .bind(id)
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

    async fn list_by_comment(&self, comment_id: i64) -> Result<Vec<i64>, DomainError> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM replies WHERE comment_id = $1 ORDER BY id ASC")
            .bind(comment_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)
    }
}
