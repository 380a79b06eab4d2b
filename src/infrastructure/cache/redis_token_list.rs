use super::{connect, scan_keys, traits::TokenList};
use crate::domain::shared::ids::ActorId;
use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use tracing::{debug, warn};

pub const TOKEN_LIST_PREFIX: &str = "USER:TOKENS";

fn token_key(uid: ActorId) -> String {
    format!("{TOKEN_LIST_PREFIX}:{uid}")
}

pub struct RedisTokenList {
    client: Client,
    capacity: usize,
    ttl_seconds: u64,
}

impl RedisTokenList {
    pub fn new(client: Client, capacity: usize, ttl_seconds: u64) -> Self {
        Self {
            client,
            capacity: capacity.max(1),
            ttl_seconds,
        }
    }
}

#[async_trait]
impl TokenList for RedisTokenList {
    async fn push(&self, uid: ActorId, token: &str) -> anyhow::Result<()> {
        let key = token_key(uid);
        let mut conn = connect(&self.client).await?;
        // RPUSH then LTRIM to the newest `capacity` entries, inside MULTI/EXEC.
        let _: () = redis::pipe()
            .atomic()
            .rpush(&key, token)
            .ignore()
            .ltrim(&key, -(self.capacity as isize), -1)
            .ignore()
            .expire(&key, self.ttl_seconds as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;
        debug!(uid, "session token pushed");
        Ok(())
    }

    async fn contains(&self, uid: ActorId, token: &str) -> anyhow::Result<bool> {
        let mut conn = connect(&self.client).await?;
        let pos: Option<i64> = redis::cmd("LPOS")
            .arg(token_key(uid))
            .arg(token)
            .query_async(&mut conn)
            .await?;
        Ok(pos.is_some())
    }

    async fn remove(&self, uid: ActorId, token: &str) -> anyhow::Result<bool> {
        let mut conn = connect(&self.client).await?;
        let removed: i64 = conn.lrem(token_key(uid), 0, token).await?;
        Ok(removed > 0)
    }

    async fn tokens(&self, uid: ActorId) -> anyhow::Result<Vec<String>> {
        let mut conn = connect(&self.client).await?;
        let tokens: Vec<String> = conn.lrange(token_key(uid), 0, -1).await?;
        Ok(tokens)
    }

    async fn owners(&self) -> anyhow::Result<Vec<ActorId>> {
        let mut conn = connect(&self.client).await?;
        let keys = scan_keys(&mut conn, &format!("{TOKEN_LIST_PREFIX}:*")).await?;
        let mut owners = Vec::with_capacity(keys.len());
        for key in keys {
            match key
                .rsplit(':')
                .next()
                .and_then(|raw| raw.parse::<ActorId>().ok())
            {
                Some(uid) => owners.push(uid),
                None => warn!(key = %key, "ignoring malformed token list key"),
            }
        }
        Ok(owners)
    }
}
