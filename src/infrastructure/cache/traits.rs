use crate::domain::shared::ids::ActorId;
use async_trait::async_trait;

/// Per-user list of live session tokens, oldest first.
///
/// The list is bounded: pushing beyond the configured capacity evicts the
/// oldest entries in the same atomic step.
#[async_trait]
pub trait TokenList: Send + Sync {
    async fn push(&self, uid: ActorId, token: &str) -> anyhow::Result<()>;
    async fn contains(&self, uid: ActorId, token: &str) -> anyhow::Result<bool>;
    /// Returns whether the token was present.
    async fn remove(&self, uid: ActorId, token: &str) -> anyhow::Result<bool>;
    async fn tokens(&self, uid: ActorId) -> anyhow::Result<Vec<String>>;
    /// Every user that currently has a token list.
    async fn owners(&self) -> anyhow::Result<Vec<ActorId>>;
}
