//! Background job publishing pool and aggregator gauges.

use std::sync::Arc;

use domain::services::Aggregator;
use sqlx::PgPool;

use super::scheduler::{Job, JobFrequency};
use crate::middleware::metrics::record_aggregator_stats;

pub struct PoolMetricsJob {
    pool: PgPool,
    aggregator: Arc<Aggregator>,
}

impl PoolMetricsJob {
    pub fn new(pool: PgPool, aggregator: Arc<Aggregator>) -> Self {
        Self { pool, aggregator }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(10)
    }

    async fn execute(&self) -> Result<(), String> {
        persistence::metrics::record_pool_metrics(&self.pool);

        let stats = self.aggregator.stats();
        record_aggregator_stats(stats.tracked_devices, stats.bucket_count, stats.dirty_count);

        Ok(())
    }
}
