use crate::{
    domain::{
        comment::{
            entity::{Comment, NewComment},
            repository::CommentRepository,
        },
        shared::errors::DomainError,
    },
    infrastructure::database::map_sqlx,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::instrument;

#[derive(FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    author_id: i64,
    username: String,
    content: String,
    like_count: i64,
    dislike_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(r: CommentRow) -> Self {
        Self {
            id: r.id,
            post_id: r.post_id,
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

pub struct SqlxCommentRepository {
    pool: PgPool,
}

impl SqlxCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: NewComment) -> Result<Comment, DomainError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "INSERT INTO comments (post_id, author_id, username, content)
             VALUES ($1, $2, $3, $4)
             RETURNING id, post_id, author_id, username, content, like_count, dislike_count,
                       created_at, updated_at",
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.username)
        .bind(&comment.content)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, DomainError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "SELECT id, post_id, author_id, username, content, like_count, dislike_count,
                    created_at, updated_at
             FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn update_content(&self, id: i64, content: &str) -> Result<bool, DomainError> {
        let updated = sqlx::query("UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(content)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?
            .rows_affected();
        Ok(updated > 0)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        sqlx::query(
            "DELETE FROM engagements
             WHERE target_kind = 'reply'
               AND target_key IN (SELECT id::text FROM replies WHERE comment_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;
        sqlx::query("DELETE FROM engagements WHERE target_kind = 'comment' AND target_key = $1::text")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        let deleted = sqlx::query("DELETE FROM comments WHERE id = $1")
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

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<i64>, DomainError> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM comments WHERE post_id = $1 ORDER BY id DESC")
            .bind(post_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)
    }
}
