use crate::infrastructure::storage::traits::AvatarStore;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Deletes avatars that were replaced since the last pass.
pub struct AvatarCleanupWorker {
    avatars: Arc<dyn AvatarStore>,
    interval_seconds: u64,
}

impl AvatarCleanupWorker {
    pub fn new(avatars: Arc<dyn AvatarStore>, interval_seconds: u64) -> Self {
        Self {
            avatars,
            interval_seconds: interval_seconds.max(10),
        }
    }

    pub async fn run_once(&self) -> anyhow::Result<u64> {
        self.avatars.drain_clean_queue().await
    }

    pub async fn start(&self) {
        loop {
            match self.run_once().await {
                Ok(deleted) => debug!(deleted, "avatar cleanup pass finished"),
                Err(e) => warn!(error = %e, "avatar cleanup pass failed"),
            }
            tokio::time::sleep(Duration::from_secs(self.interval_seconds)).await;
        }
    }
}
