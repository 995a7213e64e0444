//! Device entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the devices table.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceEntity {
    pub id: i64,
    pub device_id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub alias: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl From<DeviceEntity> for domain::models::Device {
    fn from(entity: DeviceEntity) -> Self {
        Self {
            device_id: entity.device_id,
            organization_id: entity.organization_id,
            name: entity.name,
            alias: entity.alias,
            active: entity.active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            last_seen_at: entity.last_seen_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_device_entity() -> DeviceEntity {
        DeviceEntity {
            id: 1,
            device_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: "Loom 14".to_string(),
            alias: Some("L14".to_string()),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_seen_at: Some(Utc::now()),
        }
    }

    #[test]
    fn test_device_entity_to_domain() {
        let entity = create_test_device_entity();
        let device: domain::models::Device = entity.clone().into();

        assert_eq!(device.device_id, entity.device_id);
        assert_eq!(device.organization_id, entity.organization_id);
        assert_eq!(device.name, entity.name);
        assert_eq!(device.alias, entity.alias);
        assert_eq!(device.active, entity.active);
    }

    #[test]
    fn test_device_entity_optional_fields() {
        let mut entity = create_test_device_entity();
        entity.alias = None;
        entity.last_seen_at = None;

        let device: domain::models::Device = entity.into();
        assert!(device.alias.is_none());
        assert!(device.last_seen_at.is_none());
    }
}
