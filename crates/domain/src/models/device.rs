//! Device domain model.
//!
//! Deliberately minimal: full device management belongs to the external
//! administration surface. This model carries the descriptive fields the
//! efficiency dashboard joins against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A machine registered for telemetry ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub alias: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Request payload for device registration (upsert by device id).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub device_id: Uuid,

    #[validate(custom(function = "shared::validation::validate_device_name"))]
    pub name: String,

    #[validate(length(max = 50, message = "Alias must be at most 50 characters"))]
    pub alias: Option<String>,
}

/// Response payload for device registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceResponse {
    pub device_id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub alias: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Device summary for organization listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub device_id: Uuid,
    pub name: String,
    pub alias: Option<String>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl From<Device> for RegisterDeviceResponse {
    fn from(device: Device) -> Self {
        Self {
            device_id: device.device_id,
            organization_id: device.organization_id,
            name: device.name,
            alias: device.alias,
            created_at: device.created_at,
            updated_at: device.updated_at,
        }
    }
}

impl From<Device> for DeviceSummary {
    fn from(device: Device) -> Self {
        Self {
            device_id: device.device_id,
            name: device.name,
            alias: device.alias,
            last_seen_at: device.last_seen_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_register_request_validates_name() {
        let req = RegisterDeviceRequest {
            device_id: Uuid::new_v4(),
            name: "Loom 14".to_string(),
            alias: Some("L14".to_string()),
        };
        assert!(req.validate().is_ok());

        let bad = RegisterDeviceRequest {
            device_id: Uuid::new_v4(),
            name: "/bad/".to_string(),
            alias: None,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_register_request_deserializes_camel_case() {
        let json = r#"{
            "deviceId": "550e8400-e29b-41d4-a716-446655440000",
            "name": "Ring Frame 3",
            "alias": "RF3"
        }"#;
        let req: RegisterDeviceRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.name, "Ring Frame 3");
        assert_eq!(req.alias.as_deref(), Some("RF3"));
    }
}
