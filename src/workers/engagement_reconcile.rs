use crate::domain::engagement::{entity::ReconcileReport, repository::EngagementStore};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

/// Periodically removes orphaned engagements and repairs denormalised counters.
pub struct EngagementReconcileWorker {
    store: Arc<dyn EngagementStore>,
    interval_seconds: u64,
}

impl EngagementReconcileWorker {
    pub fn new(store: Arc<dyn EngagementStore>, interval_seconds: u64) -> Self {
        Self {
            store,
            interval_seconds: interval_seconds.max(60),
        }
    }

    pub async fn run_once(&self) -> Option<ReconcileReport> {
        match self.store.reconcile().await {
            Ok(report) => {
                if report.orphans_removed > 0 || report.counters_fixed > 0 {
                    info!(
                        orphans = report.orphans_removed,
                        counters = report.counters_fixed,
                        "engagement state reconciled"
                    );
                }
                Some(report)
            }
            Err(e) => {
                warn!(error = %e, "engagement reconcile failed");
                None
            }
        }
    }

    pub async fn start(&self) {
        loop {
            self.run_once().await;
            tokio::time::sleep(Duration::from_secs(self.interval_seconds)).await;
        }
    }
}
