use super::{clean_stream::drain, traits::AvatarStore};
use crate::infrastructure::cache::connect;
use async_trait::async_trait;
use redis::Client;
use std::path::PathBuf;
use tracing::debug;

pub const AVATAR_CLEAN_STREAM: &str = "CACHE:AVATAR:CLEAN";

/// Avatars as files in `avatar_dir`; replaced ones go through the
/// `CACHE:AVATAR:CLEAN` stream.
pub struct LocalAvatarStore {
    client: Client,
    avatar_dir: PathBuf,
}

impl LocalAvatarStore {
    pub fn new(client: Client, avatar_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            avatar_dir: avatar_dir.into(),
        }
    }

    pub async fn ensure_dir(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.avatar_dir).await?;
        Ok(())
    }
}

#[async_trait]
impl AvatarStore for LocalAvatarStore {
    async fn save(&self, webp: Vec<u8>) -> anyhow::Result<String> {
        let filename = format!("{}.webp", uuid::Uuid::now_v7().simple());
        tokio::fs::write(self.avatar_dir.join(&filename), webp).await?;
        debug!(filename = %filename, "avatar saved");
        Ok(filename)
    }

    async fn retire(&self, filename: &str) -> anyhow::Result<()> {
        let mut conn = connect(&self.client).await?;
        let _: String = redis::cmd("XADD")
            .arg(AVATAR_CLEAN_STREAM)
            .arg("*")
            .arg("filename")
            .arg(filename)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn drain_clean_queue(&self) -> anyhow::Result<u64> {
        drain(&self.client, AVATAR_CLEAN_STREAM, &self.avatar_dir).await
    }
}
