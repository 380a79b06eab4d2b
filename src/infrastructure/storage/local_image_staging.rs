use super::{
    clean_stream::{bare_path, drain},
    traits::{ImageStaging, is_valid_token, new_token},
};
use crate::infrastructure::cache::{connect, scan_keys};
use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const STAGING_PREFIX: &str = "CACHE:IMAGE:LIST";
pub const CLEAN_STREAM: &str = "CACHE:IMAGE:CLEAN";

fn staging_key(token: &str) -> String {
    format!("{STAGING_PREFIX}:{token}")
}

/// Staged files live in `cache_dir`, promoted ones in `image_dir`; the Redis
/// hash per token carries `filename` and the unix `expire` time.
pub struct LocalImageStaging {
    client: Client,
    cache_dir: PathBuf,
    image_dir: PathBuf,
    ttl_seconds: i64,
}

impl LocalImageStaging {
    pub fn new(
        client: Client,
        cache_dir: impl Into<PathBuf>,
        image_dir: impl Into<PathBuf>,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            client,
            cache_dir: cache_dir.into(),
            image_dir: image_dir.into(),
            ttl_seconds,
        }
    }

    /// Creates both directories if missing.
    pub async fn ensure_dirs(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        tokio::fs::create_dir_all(&self.image_dir).await?;
        Ok(())
    }

    fn cached_path(&self, filename: &str) -> Option<PathBuf> {
        bare_path(&self.cache_dir, filename)
    }
}

#[async_trait]
impl ImageStaging for LocalImageStaging {
    async fn stage(&self, webp: Vec<u8>) -> anyhow::Result<String> {
        let token = new_token();
        let filename = format!("{token}.webp");
        tokio::fs::write(self.cache_dir.join(&filename), webp).await?;

        let expire = chrono::Utc::now().timestamp() + self.ttl_seconds;
        let mut conn = connect(&self.client).await?;
        let _: () = conn
            .hset_multiple(
                staging_key(&token),
                &[("filename", filename), ("expire", expire.to_string())],
            )
            .await?;
        debug!(token = %token, "image staged");
        Ok(token)
    }

    async fn is_available(&self, token: &str) -> anyhow::Result<bool> {
        if !is_valid_token(token) {
            return Ok(false);
        }
        let key = staging_key(token);
        let mut conn = connect(&self.client).await?;
        let entry: HashMap<String, String> = conn.hgetall(&key).await?;
        let (Some(filename), Some(expire)) = (entry.get("filename"), entry.get("expire")) else {
            return Ok(false);
        };
        let expire: i64 = expire.parse().unwrap_or(0);
        if expire < chrono::Utc::now().timestamp() {
            return Ok(false);
        }

        let Some(path) = self.cached_path(filename) else {
            return Ok(false);
        };
        if tokio::fs::try_exists(&path).await? {
            Ok(true)
        } else {
            warn!(token = %token, "staged image file missing, dropping entry");
            let _: () = conn.del(&key).await?;
            Ok(false)
        }
    }

    async fn promote(&self, token: &str) -> anyhow::Result<String> {
        if !is_valid_token(token) {
            anyhow::bail!("invalid image token: {token}");
        }
        let filename = format!("{token}.webp");
        tokio::fs::copy(
            self.cache_dir.join(&filename),
            self.image_dir.join(&filename),
        )
        .await?;

        let mut conn = connect(&self.client).await?;
        let _: () = redis::pipe()
            .atomic()
            .cmd("XADD")
            .arg(CLEAN_STREAM)
            .arg("*")
            .arg("filename")
            .arg(&filename)
            .ignore()
            .del(staging_key(token))
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(filename)
    }

    async fn discard(&self, filenames: &[String]) -> anyhow::Result<u64> {
        let mut removed = 0;
        for filename in filenames {
            let Some(path) = bare_path(&self.image_dir, filename) else {
                continue;
            };
            match tokio::fs::remove_file(path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }

    async fn sweep_expired(&self) -> anyhow::Result<u64> {
        let mut conn = connect(&self.client).await?;
        let keys = scan_keys(&mut conn, &format!("{STAGING_PREFIX}:*")).await?;
        let now = chrono::Utc::now().timestamp();
        let mut queued = 0;

        for key in keys {
            let entry: HashMap<String, String> = conn.hgetall(&key).await?;
            let expire = entry
                .get("expire")
                .and_then(|raw| raw.parse::<i64>().ok())
                .unwrap_or(0);
            if expire >= now {
                continue;
            }
            let Some(filename) = entry.get("filename") else {
                let _: () = conn.del(&key).await?;
                continue;
            };
            let _: () = redis::pipe()
                .atomic()
                .cmd("XADD")
                .arg(CLEAN_STREAM)
                .arg("*")
                .arg("filename")
                .arg(filename)
                .ignore()
                .del(&key)
                .ignore()
                .query_async(&mut conn)
                .await?;
            queued += 1;
        }

        if queued > 0 {
            info!(queued, "expired staged images queued for cleanup");
        }
        Ok(queued)
    }

    async fn drain_clean_queue(&self) -> anyhow::Result<u64> {
        drain(&self.client, CLEAN_STREAM, &self.cache_dir).await
    }
}
