use super::{bind_target_id, table_for};
use crate::{
    domain::{
        engagement::{entity::TargetRef, repository::ExistenceGuard},
        shared::errors::DomainError,
    },
    infrastructure::database::map_sqlx,
};
use async_trait::async_trait;
use sqlx::PgPool;

/// Primary-key lookups against the table owning each target kind.
pub struct SqlxTargetDirectory {
    pool: PgPool,
}

impl SqlxTargetDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExistenceGuard for SqlxTargetDirectory {
    async fn exists(&self, target: &TargetRef) -> Result<bool, DomainError> {
        let sql = format!("SELECT 1 FROM {} WHERE id = $1", table_for(target.kind));
        match bind_target_id(sqlx::query(&sql), &target.id)
            .fetch_one(&self.pool)
            .await
        {
            Ok(_) => Ok(true),
            Err(sqlx::Error::RowNotFound) => Ok(false),
            Err(e) => Err(map_sqlx(e)),
        }
    }
}
