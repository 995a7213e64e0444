//! Metric bucket domain models.
//!
//! A bucket is the aggregate metrics row for one
//! (device, organization, shift, shift-date) combination.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::shift::ShiftType;

/// Natural key of a metric bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub device_id: Uuid,
    pub organization_id: Uuid,
    pub shift_id: Uuid,
    pub shift_date: NaiveDate,
}

/// An aggregated metrics snapshot for one bucket.
///
/// Invariant: `running_minutes <= power_on_minutes`, and efficiency is the
/// running/power-on ratio as a percentage in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketSnapshot {
    pub key: BucketKey,
    pub power_on_minutes: f64,
    pub running_minutes: f64,
    pub current_rpm: f64,
    pub last_sample_at: DateTime<Utc>,
}

impl BucketSnapshot {
    /// Efficiency percentage, rounded to 2 decimal places.
    /// Zero power-on minutes yields 0 rather than a division error.
    pub fn efficiency(&self) -> f64 {
        compute_efficiency(self.running_minutes, self.power_on_minutes)
    }

    /// Merge another snapshot of the same key, taking the maximum of both
    /// minute totals and the later side's RPM reading.
    ///
    /// The merge is commutative, associative, and idempotent, which is what
    /// makes retried or concurrent commits converge.
    pub fn merge_max(&self, other: &BucketSnapshot) -> BucketSnapshot {
        debug_assert_eq!(self.key, other.key);
        let (rpm, last_sample_at) = if other.last_sample_at >= self.last_sample_at {
            (other.current_rpm, other.last_sample_at)
        } else {
            (self.current_rpm, self.last_sample_at)
        };
        BucketSnapshot {
            key: self.key,
            power_on_minutes: self.power_on_minutes.max(other.power_on_minutes),
            running_minutes: self.running_minutes.max(other.running_minutes),
            current_rpm: rpm,
            last_sample_at,
        }
    }
}

/// Computes the efficiency percentage from minute totals.
pub fn compute_efficiency(running_minutes: f64, power_on_minutes: f64) -> f64 {
    if power_on_minutes <= 0.0 {
        return 0.0;
    }
    let pct = running_minutes / power_on_minutes * 100.0;
    (pct.clamp(0.0, 100.0) * 100.0).round() / 100.0
}

/// Bucket payload returned by the ingestion and dashboard endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketResponse {
    pub device_id: Uuid,
    pub organization_id: Uuid,
    pub shift_id: Uuid,
    pub shift_date: NaiveDate,
    pub power_on_minutes: f64,
    pub running_minutes: f64,
    pub efficiency: f64,
    pub current_rpm: f64,
    pub last_sample_at: DateTime<Utc>,
}

impl From<BucketSnapshot> for BucketResponse {
    fn from(snapshot: BucketSnapshot) -> Self {
        Self {
            device_id: snapshot.key.device_id,
            organization_id: snapshot.key.organization_id,
            shift_id: snapshot.key.shift_id,
            shift_date: snapshot.key.shift_date,
            power_on_minutes: snapshot.power_on_minutes,
            running_minutes: snapshot.running_minutes,
            efficiency: snapshot.efficiency(),
            current_rpm: snapshot.current_rpm,
            last_sample_at: snapshot.last_sample_at,
        }
    }
}

/// One row of the efficiency dashboard: bucket metrics joined with device
/// and shift descriptive fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyRow {
    pub device_id: Uuid,
    pub device_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_alias: Option<String>,
    pub shift_id: Uuid,
    pub shift_type: ShiftType,
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
