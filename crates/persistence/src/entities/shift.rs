//! Shift definition entity (database row mapping).

use chrono::{DateTime, NaiveTime, Utc};
use domain::models::{ShiftDefinition, ShiftType};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the shift_definitions table.
#[derive(Debug, Clone, FromRow)]
pub struct ShiftEntity {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub shift_type: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ShiftEntity> for ShiftDefinition {
    type Error = sqlx::Error;

    /// The shift_type column carries a CHECK constraint, so a parse failure
    /// means schema drift and surfaces as a decode error.
    fn try_from(entity: ShiftEntity) -> Result<Self, Self::Error> {
        let shift_type = entity
            .shift_type
            .parse::<ShiftType>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;
        Ok(Self {
            id: entity.id,
            organization_id: entity.organization_id,
            shift_type,
            start_time: entity.start_time,
            end_time: entity.end_time,
            created_by: entity.created_by,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}
