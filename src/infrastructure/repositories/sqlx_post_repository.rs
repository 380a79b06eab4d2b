use crate::{
    domain::{
        post::{
            entity::{NewPost, Post},
            repository::PostRepository,
        },
        shared::{
            errors::DomainError,
            ids::{ActorId, TopicId},
            pagination::CursorPage,
        },
    },
    infrastructure::database::map_sqlx,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::ipnetwork::IpNetwork};
use std::str::FromStr;
use tracing::{info, instrument};

const POST_COLUMNS: &str = "id, author_id, ip_address, title, content, images, topic_id, \
                            like_count, favourite_count, created_at, updated_at";

#[derive(FromRow)]
struct PostRow {
    id: i64,
    author_id: i64,
    ip_address: Option<IpNetwork>,
    title: String,
    content: String,
    images: Vec<String>,
    topic_id: Option<String>,
    like_count: i64,
    favourite_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = DomainError;

    fn try_from(r: PostRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            author_id: r.author_id,
            ip_address: r.ip_address.map(|ip| ip.ip().to_string()),
            title: r.title,
            content: r.content,
            images: r.images,
            topic_id: r.topic_id.as_deref().map(TopicId::parse_hex).transpose()?,
            like_count: r.like_count,
            favourite_count: r.favourite_count,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

pub struct SqlxPostRepository {
    pool: PgPool,
}

impl SqlxPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    #[instrument(skip(self, post), fields(author = post.author_id))]
    async fn create(&self, post: NewPost) -> Result<Post, DomainError> {
        // unparseable client addresses are stored as NULL
        let ip = post
            .ip_address
            .as_deref()
            .and_then(|ip| IpNetwork::from_str(ip).ok());
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "INSERT INTO posts (author_id, ip_address, title, content, images, topic_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(post.author_id)
        .bind(ip)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.images)
        .bind(post.topic_id.map(|t| t.to_hex()))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.try_into()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, DomainError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.map(Post::try_from).transpose()
    }

    async fn list_recent(&self, page: CursorPage) -> Result<Vec<i64>, DomainError> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM posts WHERE id < $1 ORDER BY id DESC LIMIT $2")
            .bind(page.upper_bound())
            .bind(page.len)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn list_by_author(
        &self,
        author: ActorId,
        page: CursorPage,
    ) -> Result<Vec<i64>, DomainError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM posts WHERE author_id = $1 AND id < $2 ORDER BY id DESC LIMIT $3",
        )
        .bind(author)
        .bind(page.upper_bound())
        .bind(page.len)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn list_by_topic(
        &self,
        topic: TopicId,
        page: CursorPage,
    ) -> Result<Vec<i64>, DomainError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM posts WHERE topic_id = $1 AND id < $2 ORDER BY id DESC LIMIT $3",
        )
        .bind(topic.to_hex())
        .bind(page.upper_bound())
        .bind(page.len)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn list_by_authors(
        &self,
        authors: &[ActorId],
        page: CursorPage,
    ) -> Result<Vec<i64>, DomainError> {
        if authors.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM posts WHERE author_id = ANY($1) AND id < $2 ORDER BY id DESC LIMIT $3",
        )
        .bind(authors.to_vec())
        .bind(page.upper_bound())
        .bind(page.len)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn count_by_topic(&self, topic: TopicId) -> Result<i64, DomainError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE topic_id = $1")
            .bind(topic.to_hex())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let purged_replies = sqlx::query(
            "DELETE FROM engagements
             WHERE target_kind = 'reply' AND target_key IN (
                SELECT r.id::text FROM replies r
                JOIN comments c ON c.id = r.comment_id
                WHERE c.post_id = $1
             )",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?
        .rows_affected();
        let purged_comments = sqlx::query(
            "DELETE FROM engagements
             WHERE target_kind = 'comment'
               AND target_key IN (SELECT id::text FROM comments WHERE post_id = $1)",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?
        .rows_affected();
        let purged_post = sqlx::query(
            "DELETE FROM engagements WHERE target_kind = 'post' AND target_key = $1::text",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?
        .rows_affected();

        // comments and replies go with the post through ON DELETE CASCADE
        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1")
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
        info!(
            engagements_removed = purged_replies + purged_comments + purged_post,
            "post deleted"
        );
        Ok(true)
    }
}
