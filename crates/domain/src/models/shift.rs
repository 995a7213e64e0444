//! Shift definition domain models.

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Shift types available to an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShiftType {
    Day,
    Night,
    Extra,
}

impl FromStr for ShiftType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DAY" => Ok(ShiftType::Day),
            "NIGHT" => Ok(ShiftType::Night),
            "EXTRA" => Ok(ShiftType::Extra),
            _ => Err(format!("Unknown shift type: {}", s)),
        }
    }
}

impl std::fmt::Display for ShiftType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShiftType::Day => write!(f, "DAY"),
            ShiftType::Night => write!(f, "NIGHT"),
            ShiftType::Extra => write!(f, "EXTRA"),
        }
    }
}

/// A recurring daily shift window for an organization.
///
/// Start and end are wall-clock times of day; a window whose end is at or
/// before its start wraps past midnight (e.g. 22:00-06:00).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftDefinition {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub shift_type: ShiftType,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShiftDefinition {
    /// Minute-of-day offset of the window start.
    pub fn start_minute(&self) -> u32 {
        self.start_time.hour() * 60 + self.start_time.minute()
    }

    /// Minute-of-day offset of the window end.
    pub fn end_minute(&self) -> u32 {
        self.end_time.hour() * 60 + self.end_time.minute()
    }

    /// Whether the window wraps past midnight.
    pub fn wraps_midnight(&self) -> bool {
        self.end_minute() <= self.start_minute()
    }
}

/// Request payload for creating a shift definition.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateShiftRequest {
    pub shift_type: ShiftType,

    /// Window start, wall-clock time of day (HH:MM or HH:MM:SS).
    pub start_time: NaiveTime,

    /// Window end, wall-clock time of day. End at or before start wraps past midnight.
    pub end_time: NaiveTime,

    pub created_by: Option<Uuid>,
}

/// Request payload for updating a shift definition.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShiftRequest {
    pub shift_type: Option<ShiftType>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

/// Response payload for shift definition endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftResponse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub shift_type: ShiftType,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ShiftDefinition> for ShiftResponse {
    fn from(shift: ShiftDefinition) -> Self {
        Self {
            id: shift.id,
            organization_id: shift.organization_id,
            shift_type: shift.shift_type,
            start_time: shift.start_time,
            end_time: shift.end_time,
            created_at: shift.created_at,
            updated_at: shift.updated_at,
        }
    }
}
