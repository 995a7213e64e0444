//! Background job purging bucket rows past the retention horizon.

use chrono::{Duration, Utc};
use persistence::repositories::MetricBucketRepository;
use sqlx::PgPool;
use tracing::info;

use super::scheduler::{Job, JobFrequency};

const PURGE_BATCH_SIZE: i64 = 10_000;

pub struct PurgeBucketsJob {
    pool: PgPool,
    retention_days: u32,
}

impl PurgeBucketsJob {
    /// A retention of zero days disables purging entirely.
    pub fn new(pool: PgPool, retention_days: u32) -> Self {
        Self {
            pool,
            retention_days,
        }
    }
}

#[async_trait::async_trait]
impl Job for PurgeBucketsJob {
    fn name(&self) -> &'static str {
        "purge_buckets"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Daily
    }

    async fn execute(&self) -> Result<(), String> {
        if self.retention_days == 0 {
            info!("Bucket retention disabled, skipping purge");
            return Ok(());
        }

        let cutoff = Utc::now().date_naive() - Duration::days(i64::from(self.retention_days));
        let repo = MetricBucketRepository::new(self.pool.clone());

        // Batched so the delete never holds a long transaction against
        // concurrent ingest upserts.
        let mut total_deleted = 0u64;
        loop {
            let deleted = repo
                .delete_batch_older_than(cutoff, PURGE_BATCH_SIZE)
                .await
                .map_err(|e| format!("Failed to purge bucket batch: {}", e))?;

            total_deleted += deleted;
            if deleted < PURGE_BATCH_SIZE as u64 {
                break;
            }
            tokio::task::yield_now().await;
        }

        info!(
            cutoff = %cutoff,
            deleted = total_deleted,
            "Bucket purge completed"
        );
        Ok(())
    }
}
