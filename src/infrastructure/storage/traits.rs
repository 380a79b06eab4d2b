use async_trait::async_trait;

/// Two-phase storage for post images.
///
/// Uploads land in a staging area under a random token and expire unless a
/// post claims them. Promotion copies the file into permanent storage and
/// schedules the staged copy for deletion.
#[async_trait]
pub trait ImageStaging: Send + Sync {
    /// Stores already-encoded WebP bytes; returns the staging token.
    async fn stage(&self, webp: Vec<u8>) -> anyhow::Result<String>;
    /// Whether `token` names an unexpired staged image whose file exists.
    async fn is_available(&self, token: &str) -> anyhow::Result<bool>;
    /// Moves the staged image to permanent storage, returning its file name.
    async fn promote(&self, token: &str) -> anyhow::Result<String>;
    /// Deletes promoted images that no post ended up referencing.
    async fn discard(&self, filenames: &[String]) -> anyhow::Result<u64>;
    /// Queues expired staged images for deletion. Returns how many were queued.
    async fn sweep_expired(&self) -> anyhow::Result<u64>;
    /// Deletes queued staging files. Returns how many queue entries were settled.
    async fn drain_clean_queue(&self) -> anyhow::Result<u64>;
}

/// Permanent storage for user avatars.
///
/// Replaced avatars are not deleted inline; they are queued and removed by
/// the avatar cleanup worker.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    /// Stores already-encoded WebP bytes under a fresh file name and returns it.
    async fn save(&self, webp: Vec<u8>) -> anyhow::Result<String>;
    /// Queues `filename` for deletion.
    async fn retire(&self, filename: &str) -> anyhow::Result<()>;
    /// Deletes queued avatars. Returns how many queue entries were settled.
    async fn drain_clean_queue(&self) -> anyhow::Result<u64>;
}

/// Staging tokens are simple-format v4 UUIDs.
pub fn is_valid_token(token: &str) -> bool {
    token.len() == 32 && token.bytes().all(|b| b.is_ascii_hexdigit())
}

pub fn new_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
