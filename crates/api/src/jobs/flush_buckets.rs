//! Background job flushing dirty aggregation buckets to the database.
//!
//! Ingest commits write-through, so this job is the safety net for
//! buckets whose inline commit failed. It also runs track and bucket
//! eviction so the in-memory state stays bounded.

use std::sync::Arc;

use chrono::Utc;
use domain::services::Aggregator;
use persistence::repositories::MetricBucketRepository;
use sqlx::PgPool;
use tracing::{info, warn};

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::{record_aggregator_stats, record_buckets_committed};

pub struct FlushBucketsJob {
    pool: PgPool,
    aggregator: Arc<Aggregator>,
}

impl FlushBucketsJob {
    pub fn new(pool: PgPool, aggregator: Arc<Aggregator>) -> Self {
        Self { pool, aggregator }
    }
}

#[async_trait::async_trait]
impl Job for FlushBucketsJob {
    fn name(&self) -> &'static str {
        "flush_buckets"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(1)
    }

    async fn execute(&self) -> Result<(), String> {
        let dirty = self.aggregator.drain_dirty();
        let repo = MetricBucketRepository::new(self.pool.clone());

        let mut committed = 0usize;
        let mut failed = 0usize;
        for snapshot in &dirty {
            match repo.commit(snapshot).await {
                Ok(()) => committed += 1,
                Err(e) => {
                    failed += 1;
                    warn!(
                        device_id = %snapshot.key.device_id,
                        shift_id = %snapshot.key.shift_id,
                        shift_date = %snapshot.key.shift_date,
                        error = %e,
                        "Failed to flush bucket"
                    );
                }
            }
        }

        if committed > 0 {
            record_buckets_committed(committed);
        }

        let (evicted_tracks, evicted_buckets) = self.aggregator.evict(Utc::now());
        let stats = self.aggregator.stats();
        record_aggregator_stats(stats.tracked_devices, stats.bucket_count, stats.dirty_count);

        info!(
            committed,
            failed, evicted_tracks, evicted_buckets, "Bucket flush completed"
        );

        if failed > 0 {
            Err(format!("{} bucket commits failed", failed))
        } else {
            Ok(())
        }
    }
}
