use crate::{
    domain::{
        shared::{errors::DomainError, ids::ActorId},
        user::{
            entity::{ProfileUpdate, User},
            repository::UserRepository,
        },
    },
    infrastructure::database::{is_unique_violation, map_sqlx},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

const USER_COLUMNS: &str = "id, username, password_hash, nickname, birth, gender, avatar, \
     follower_count, following_count, created_at, updated_at";

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password_hash: String,
    nickname: String,
    birth: Option<i64>,
    gender: String,
    avatar: String,
    follower_count: i64,
    following_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            username: r.username,
            password_hash: r.password_hash,
            nickname: r.nickname,
            birth: r.birth,
            gender: r.gender,
            avatar: r.avatar,
            follower_count: r.follower_count,
            following_count: r.following_count,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub struct SqlxUserRepository {
    pool: PgPool,
}

impl SqlxUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn missing(id: ActorId) -> DomainError {
    DomainError::TargetNotFound(format!("user {id}"))
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, DomainError> {
        let sql = format!(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::ValidationError(format!("username {username} is taken"))
                } else {
                    map_sqlx(e)
                }
            })?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: ActorId) -> Result<Option<User>, DomainError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn update_password(&self, id: ActorId, password_hash: &str) -> Result<(), DomainError> {
        let affected = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?
        .rows_affected();
        if affected == 0 {
            return Err(missing(id));
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        id: ActorId,
        update: ProfileUpdate,
    ) -> Result<User, DomainError> {
        let sql = format!(
            "UPDATE users SET
                nickname = COALESCE($2, nickname),
                birth = COALESCE($3, birth),
                gender = COALESCE($4, gender),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(update.nickname)
            .bind(update.birth)
            .bind(update.gender)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .ok_or_else(|| missing(id))?;
        Ok(row.into())
    }

    async fn replace_avatar(&self, id: ActorId, avatar: &str) -> Result<String, DomainError> {
        // the row lock keeps two concurrent uploads from both reading the same predecessor
        sqlx::query_scalar::<_, String>(
            "UPDATE users u SET avatar = $2, updated_at = NOW()
             FROM (SELECT id, avatar FROM users WHERE id = $1 FOR UPDATE) previous
             WHERE u.id = previous.id
             RETURNING previous.avatar",
        )
        .bind(id)
        .bind(avatar)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .ok_or_else(|| missing(id))
    }
}
