//! Shift definition repository.

use chrono::{NaiveTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::ShiftEntity;
use crate::metrics::QueryTimer;

/// Repository for shift definition database operations.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: PgPool,
}

impl ShiftRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new shift definition.
    pub async fn insert(
        &self,
        organization_id: Uuid,
        shift_type: &str,
        start_time: NaiveTime,
        end_time: NaiveTime,
        created_by: Option<Uuid>,
    ) -> Result<ShiftEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_shift");
        let result = sqlx::query_as::<_, ShiftEntity>(
            r#"
            INSERT INTO shift_definitions
                (id, organization_id, shift_type, start_time, end_time, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id, organization_id, shift_type, start_time, end_time,
                      created_by, created_at, updated_at, deleted_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(organization_id)
        .bind(shift_type)
        .bind(start_time)
        .bind(end_time)
        .bind(created_by)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find all live (not soft-deleted) shift definitions for an organization,
    /// sorted by window start.
    pub async fn find_live_by_org(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<ShiftEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_live_shifts_by_org");
        let result = sqlx::query_as::<_, ShiftEntity>(
            r#"
            SELECT id, organization_id, shift_type, start_time, end_time,
                   created_by, created_at, updated_at, deleted_at
            FROM shift_definitions
            WHERE organization_id = $1 AND deleted_at IS NULL
            ORDER BY start_time ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a live shift definition by id within an organization.
    pub async fn find_by_id(
        &self,
        organization_id: Uuid,
        shift_id: Uuid,
    ) -> Result<Option<ShiftEntity>, sqlx::Error> {
        sqlx::query_as::<_, ShiftEntity>(
            r#"
            SELECT id, organization_id, shift_type, start_time, end_time,
                   created_by, created_at, updated_at, deleted_at
            FROM shift_definitions
            WHERE id = $1 AND organization_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(shift_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Update a live shift definition's window.
    /// Returns None when the shift does not exist or is soft-deleted.
    pub async fn update(
        &self,
        organization_id: Uuid,
        shift_id: Uuid,
        shift_type: &str,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Option<ShiftEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_shift");
        let result = sqlx::query_as::<_, ShiftEntity>(
            r#"
            UPDATE shift_definitions
            SET shift_type = $3, start_time = $4, end_time = $5, updated_at = $6
            WHERE id = $1 AND organization_id = $2 AND deleted_at IS NULL
            RETURNING id, organization_id, shift_type, start_time, end_time,
                      created_by, created_at, updated_at, deleted_at
            "#,
        )
        .bind(shift_id)
        .bind(organization_id)
        .bind(shift_type)
        .bind(start_time)
        .bind(end_time)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Soft-delete a shift definition. Historical buckets keep referencing
    /// the row, only the live window set shrinks.
    /// Returns the number of rows affected (0 if not found or already deleted).
    pub async fn soft_delete(
        &self,
        organization_id: Uuid,
        shift_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE shift_definitions
            SET deleted_at = $3, updated_at = $3
            WHERE id = $1 AND organization_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(shift_id)
        .bind(organization_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
