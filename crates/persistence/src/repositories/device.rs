//! Device repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::DeviceEntity;
use crate::metrics::QueryTimer;

/// Repository for device-related database operations.
#[derive(Debug, Clone)]
pub struct DeviceRepository {
    pool: PgPool,
}

impl DeviceRepository {
    /// Creates a new DeviceRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a device by its UUID.
    pub async fn find_by_device_id(
        &self,
        device_id: Uuid,
    ) -> Result<Option<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(
            r#"
            SELECT id, device_id, organization_id, name, alias, active,
                   created_at, updated_at, last_seen_at
            FROM devices
            WHERE device_id = $1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Upsert a device (insert or update on conflict).
    /// Returns the device entity after upsert.
    pub async fn upsert_device(
        &self,
        device_id: Uuid,
        organization_id: Uuid,
        name: &str,
        alias: Option<&str>,
    ) -> Result<DeviceEntity, sqlx::Error> {
        let timer = QueryTimer::new("upsert_device");
        let now = Utc::now();

        let result = sqlx::query_as::<_, DeviceEntity>(
            r#"
            INSERT INTO devices (device_id, organization_id, name, alias, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, true, $5, $5)
            ON CONFLICT (device_id) DO UPDATE SET
                organization_id = EXCLUDED.organization_id,
                name = EXCLUDED.name,
                alias = EXCLUDED.alias,
                active = true,
                updated_at = EXCLUDED.updated_at
            RETURNING id, device_id, organization_id, name, alias, active,
                      created_at, updated_at, last_seen_at
            "#,
        )
        .bind(device_id)
        .bind(organization_id)
        .bind(name)
        .bind(alias)
        .bind(now)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find all active devices in an organization, sorted by name.
    pub async fn find_active_devices_by_org(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<DeviceEntity>, sqlx::Error> {
        sqlx::query_as::<_, DeviceEntity>(
            r#"
            SELECT id, device_id, organization_id, name, alias, active,
                   created_at, updated_at, last_seen_at
            FROM devices
            WHERE organization_id = $1 AND active = true
            ORDER BY name ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Update last_seen_at timestamp for a device.
    pub async fn update_last_seen_at(
        &self,
        device_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE devices
            SET last_seen_at = $2
            WHERE device_id = $1
            "#,
        )
        .bind(device_id)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
