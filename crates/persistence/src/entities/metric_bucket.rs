//! Metric bucket entities (database row mappings).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use domain::models::metric_bucket::{BucketKey, BucketSnapshot, EfficiencyRow};
use domain::models::ShiftType;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the metric_buckets table.
#[derive(Debug, Clone, FromRow)]
pub struct MetricBucketEntity {
    pub id: i64,
    pub device_id: Uuid,
    pub organization_id: Uuid,
    pub shift_id: Uuid,
    pub shift_date: NaiveDate,
    pub power_on_minutes: f64,
    pub running_minutes: f64,
    pub efficiency: f64,
    pub current_rpm: f64,
    pub last_sample_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MetricBucketEntity> for BucketSnapshot {
    fn from(entity: MetricBucketEntity) -> Self {
        Self {
            key: BucketKey {
                device_id: entity.device_id,
                organization_id: entity.organization_id,
                shift_id: entity.shift_id,
                shift_date: entity.shift_date,
            },
            power_on_minutes: entity.power_on_minutes,
            running_minutes: entity.running_minutes,
            current_rpm: entity.current_rpm,
            last_sample_at: entity.last_sample_at,
        }
    }
}

/// Database row mapping for the efficiency dashboard join.
#[derive(Debug, Clone, FromRow)]
pub struct EfficiencyRowEntity {
    pub device_id: Uuid,
    pub device_name: String,
    pub device_alias: Option<String>,
    pub shift_id: Uuid,
    pub shift_type: String,
    pub shift_start: NaiveTime,
    pub shift_end: NaiveTime,
    pub shift_date: NaiveDate,
    pub power_on_minutes: f64,
    pub running_minutes: f64,
    pub efficiency: f64,
    pub current_rpm: f64,
    pub last_sample_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EfficiencyRowEntity> for EfficiencyRow {
    type Error = sqlx::Error;

    fn try_from(entity: EfficiencyRowEntity) -> Result<Self, Self::Error> {
        let shift_type = entity
            .shift_type
            .parse::<ShiftType>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        Ok(Self {
            device_id: entity.device_id,
            device_name: entity.device_name,
            device_alias: entity.device_alias,
            shift_id: entity.shift_id,
            shift_type,
            shift_start: entity.shift_start,
            shift_end: entity.shift_end,
            shift_date: entity.shift_date,
            power_on_minutes: entity.power_on_minutes,
            running_minutes: entity.running_minutes,
            efficiency: entity.efficiency,
            current_rpm: entity.current_rpm,
            last_sample_at: entity.last_sample_at,
            updated_at: entity.updated_at,
        })
    }
}
