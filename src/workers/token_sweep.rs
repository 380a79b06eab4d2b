use crate::application::users::use_case::UserService;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

/// Drops expired bearer tokens from every user's session list.
pub struct TokenSweepWorker {
    users: Arc<UserService>,
    interval_seconds: u64,
}

impl TokenSweepWorker {
    pub fn new(users: Arc<UserService>, interval_seconds: u64) -> Self {
        Self {
            users,
            interval_seconds: interval_seconds.max(60),
        }
    }

    pub async fn start(&self) {
        loop {
            match self.users.sweep_tokens().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "expired tokens swept"),
                Err(e) => warn!(error = %e, "token sweep failed"),
            }
            tokio::time::sleep(Duration::from_secs(self.interval_seconds)).await;
        }
    }
}
