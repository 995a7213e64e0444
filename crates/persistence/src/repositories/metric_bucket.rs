//! Metric bucket repository.
//!
//! Commits merge by maximum: the stored row and the incoming snapshot take
//! the greater of each minute total, so retried or concurrently flushed
//! snapshots of the same bucket converge instead of double-counting.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::metric_bucket::{BucketKey, BucketSnapshot};
use rand::Rng;
use sqlx::PgPool;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::entities::{EfficiencyRowEntity, MetricBucketEntity};
use crate::metrics::{record_commit_retry, QueryTimer};

/// Maximum attempts for a bucket commit hit by a serialization conflict.
const COMMIT_MAX_ATTEMPTS: u32 = 3;

/// SQLSTATEs worth retrying: serialization_failure and deadlock_detected.
const RETRYABLE_SQLSTATES: [&str; 2] = ["40001", "40P01"];

fn is_retryable(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| RETRYABLE_SQLSTATES.contains(&code.as_ref()))
            .unwrap_or(false),
        _ => false,
    }
}

/// Repository for aggregated metric bucket rows.
#[derive(Debug, Clone)]
pub struct MetricBucketRepository {
    pool: PgPool,
}

impl MetricBucketRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Commit a snapshot, merging with any existing row by maximum.
    ///
    /// Retries up to [`COMMIT_MAX_ATTEMPTS`] times with jittered backoff on
    /// serialization conflicts; any other error surfaces immediately.
    pub async fn commit(&self, snapshot: &BucketSnapshot) -> Result<(), sqlx::Error> {
        let mut attempt = 1;
        loop {
            match self.upsert(snapshot).await {
                Ok(()) => return Ok(()),
                Err(err) if is_retryable(&err) && attempt < COMMIT_MAX_ATTEMPTS => {
                    warn!(
                        device_id = %snapshot.key.device_id,
                        shift_id = %snapshot.key.shift_id,
                        attempt,
                        error = %err,
                        "Bucket commit conflict, retrying"
                    );
                    record_commit_retry();
                    let backoff_ms = {
                        let mut rng = rand::thread_rng();
                        rng.gen_range(25..100) * attempt as u64
                    };
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn upsert(&self, snapshot: &BucketSnapshot) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("commit_metric_bucket");
        let now = Utc::now();

        // Efficiency is recomputed in-statement from the merged totals, so
        // the stored percentage always matches the stored minutes.
        let result = sqlx::query(
            r#"
            INSERT INTO metric_buckets
                (device_id, organization_id, shift_id, shift_date,
                 power_on_minutes, running_minutes, efficiency, current_rpm,
                 last_sample_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            ON CONFLICT (device_id, organization_id, shift_id, shift_date) DO UPDATE SET
                power_on_minutes = GREATEST(metric_buckets.power_on_minutes, EXCLUDED.power_on_minutes),
                running_minutes = GREATEST(metric_buckets.running_minutes, EXCLUDED.running_minutes),
                efficiency = CASE
                    WHEN GREATEST(metric_buckets.power_on_minutes, EXCLUDED.power_on_minutes) <= 0 THEN 0
                    ELSE ROUND(LEAST(
                        GREATEST(metric_buckets.running_minutes, EXCLUDED.running_minutes)
                        / GREATEST(metric_buckets.power_on_minutes, EXCLUDED.power_on_minutes) * 100.0,
                        100.0)::numeric, 2)::double precision
                END,
                current_rpm = CASE
                    WHEN EXCLUDED.last_sample_at >= metric_buckets.last_sample_at THEN EXCLUDED.current_rpm
                    ELSE metric_buckets.current_rpm
                END,
                last_sample_at = GREATEST(metric_buckets.last_sample_at, EXCLUDED.last_sample_at),
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(snapshot.key.device_id)
        .bind(snapshot.key.organization_id)
        .bind(snapshot.key.shift_id)
        .bind(snapshot.key.shift_date)
        .bind(snapshot.power_on_minutes)
        .bind(snapshot.running_minutes)
        .bind(snapshot.efficiency())
        .bind(snapshot.current_rpm)
        .bind(snapshot.last_sample_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map(|_| ());
        timer.record();
        result
    }

    /// Find a bucket row by its natural key.
    pub async fn find_by_key(
        &self,
        key: &BucketKey,
    ) -> Result<Option<MetricBucketEntity>, sqlx::Error> {
        sqlx::query_as::<_, MetricBucketEntity>(
            r#"
            SELECT id, device_id, organization_id, shift_id, shift_date,
                   power_on_minutes, running_minutes, efficiency, current_rpm,
                   last_sample_at, created_at, updated_at
            FROM metric_buckets
            WHERE device_id = $1 AND organization_id = $2
              AND shift_id = $3 AND shift_date = $4
            "#,
        )
        .bind(key.device_id)
        .bind(key.organization_id)
        .bind(key.shift_id)
        .bind(key.shift_date)
        .fetch_optional(&self.pool)
        .await
    }

    /// Paged efficiency dashboard rows for one organization and shift-date,
    /// joined with device and shift descriptive fields.
    pub async fn list_efficiency(
        &self,
        organization_id: Uuid,
        shift_date: NaiveDate,
        search: Option<&str>,
        updated_since: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<EfficiencyRowEntity>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_efficiency_rows");

        // Build count query
        let mut count_sql = String::from(
            r#"
            SELECT COUNT(*) as count
            FROM metric_buckets mb
            JOIN devices d ON d.device_id = mb.device_id
            JOIN shift_definitions s ON s.id = mb.shift_id
            WHERE mb.organization_id = $1
              AND mb.shift_date = $2
            "#,
        );

        let mut param_idx = 3;
        if search.is_some() {
            count_sql.push_str(&format!(
                " AND (d.name ILIKE ${0} OR d.alias ILIKE ${0})",
                param_idx
            ));
            param_idx += 1;
        }
        if updated_since.is_some() {
            count_sql.push_str(&format!(" AND mb.updated_at > ${}", param_idx));
        }

        // Build main query
        let mut sql = String::from(
            r#"
            SELECT
                mb.device_id, d.name as device_name, d.alias as device_alias,
                mb.shift_id, s.shift_type, s.start_time as shift_start,
                s.end_time as shift_end, mb.shift_date,
                mb.power_on_minutes, mb.running_minutes, mb.efficiency,
                mb.current_rpm, mb.last_sample_at, mb.updated_at
            FROM metric_buckets mb
            JOIN devices d ON d.device_id = mb.device_id
            JOIN shift_definitions s ON s.id = mb.shift_id
            WHERE mb.organization_id = $1
              AND mb.shift_date = $2
            "#,
        );

        param_idx = 3;
        if search.is_some() {
            sql.push_str(&format!(
                " AND (d.name ILIKE ${0} OR d.alias ILIKE ${0})",
                param_idx
            ));
            param_idx += 1;
        }
        if updated_since.is_some() {
            sql.push_str(&format!(" AND mb.updated_at > ${}", param_idx));
            param_idx += 1;
        }

        sql.push_str(&format!(
            " ORDER BY d.name ASC, s.start_time ASC LIMIT ${} OFFSET ${}",
            param_idx,
            param_idx + 1
        ));

        let pattern = search.map(|s| format!("%{}%", s));

        // Execute count query
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(organization_id)
            .bind(shift_date);
        if let Some(p) = &pattern {
            count_query = count_query.bind(p);
        }
        if let Some(ts) = updated_since {
            count_query = count_query.bind(ts);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        // Execute main query
        let mut main_query = sqlx::query_as::<_, EfficiencyRowEntity>(&sql)
            .bind(organization_id)
            .bind(shift_date);
        if let Some(p) = &pattern {
            main_query = main_query.bind(p);
        }
        if let Some(ts) = updated_since {
            main_query = main_query.bind(ts);
        }
        main_query = main_query.bind(limit).bind(offset);

        let rows = main_query.fetch_all(&self.pool).await?;
        timer.record();

        Ok((rows, total))
    }

    /// Delete one batch of bucket rows older than the cutoff date.
    /// Returns the number of rows deleted; callers loop until a short batch.
    pub async fn delete_batch_older_than(
        &self,
        cutoff: NaiveDate,
        batch_size: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            WITH to_delete AS (
                SELECT id FROM metric_buckets
                WHERE shift_date < $1
                LIMIT $2
            )
            DELETE FROM metric_buckets
            WHERE id IN (SELECT id FROM to_delete)
            "#,
        )
        .bind(cutoff)
        .bind(batch_size)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_sqlstates() {
        assert!(RETRYABLE_SQLSTATES.contains(&"40001"));
        assert!(RETRYABLE_SQLSTATES.contains(&"40P01"));
        assert!(!RETRYABLE_SQLSTATES.contains(&"23505"));
    }

    #[test]
    fn test_non_database_errors_not_retryable() {
        assert!(!is_retryable(&sqlx::Error::RowNotFound));
        assert!(!is_retryable(&sqlx::Error::PoolClosed));
    }
}
