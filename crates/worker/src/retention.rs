//! Retention job: deletes indicators older than the horizon.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::{Result, RetentionPolicy, Store, StoreError};
use std::sync::Arc;
use telemetry::metrics;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::job::{Job, JobReport};

pub const RETENTION_JOB: &str = "cleanup_job";

pub struct RetentionJob {
    store: Arc<dyn Store>,
    policy: RetentionPolicy,
}

impl RetentionJob {
    pub fn new(store: Arc<dyn Store>, policy: RetentionPolicy) -> Self {
        Self { store, policy }
    }

    /// Deletes every indicator with a timestamp strictly before `now - horizon`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> std::result::Result<u64, StoreError> {
        let cutoff = self.policy.cutoff(now);
        info!(cutoff = %cutoff, horizon_days = self.policy.horizon_days, "Running retention");

        let deleted = self.store.delete_older_than(cutoff).await?;
        metrics().records_pruned.inc_by(deleted);

        if deleted > 0 {
            info!(deleted, "Deleted expired indicators");
        } else {
            info!("No expired indicators");
        }
        Ok(deleted)
    }
}

#[async_trait]
impl Job for RetentionJob {
    fn name(&self) -> &str {
        RETENTION_JOB
    }

    async fn execute(&self, _cancel: &CancellationToken) -> Result<JobReport> {
        let deleted = self.run_at(Utc::now()).await?;
        Ok(JobReport::Retention { deleted })
    }
}
