use crate::infrastructure::storage::traits::ImageStaging;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Expires unclaimed staged images and deletes queued staging files.
pub struct ImageCleanupWorker {
    images: Arc<dyn ImageStaging>,
    interval_seconds: u64,
}

impl ImageCleanupWorker {
    pub fn new(images: Arc<dyn ImageStaging>, interval_seconds: u64) -> Self {
        Self {
            images,
            interval_seconds: interval_seconds.max(10),
        }
    }

    /// One sweep-then-drain pass. Returns `(expired, deleted)`.
    pub async fn run_once(&self) -> anyhow::Result<(u64, u64)> {
        let expired = self.images.sweep_expired().await?;
        let deleted = self.images.drain_clean_queue().await?;
        Ok((expired, deleted))
    }

    pub async fn start(&self) {
        loop {
            match self.run_once().await {
                Ok((expired, deleted)) => {
                    debug!(expired, deleted, "image cleanup pass finished")
                }
                Err(e) => warn!(error = %e, "image cleanup pass failed"),
            }
            tokio::time::sleep(Duration::from_secs(self.interval_seconds)).await;
        }
    }
}
