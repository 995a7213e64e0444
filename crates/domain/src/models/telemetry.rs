//! Telemetry sample domain models.
//!
//! Samples are ephemeral: they are classified into a shift/date bucket and
//! folded into aggregates, never persisted as first-class rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A single raw machine telemetry observation.
#[derive(Debug, Clone, Copy)]
pub struct TelemetrySample {
    pub device_id: Uuid,
    pub organization_id: Uuid,
    pub observed_at: DateTime<Utc>,
    pub running: bool,
    pub rpm: f64,
}

/// A sample routed to its owning shift and shift-date bucket.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedSample {
    pub shift_id: Uuid,
    pub shift_date: NaiveDate,
    pub sample: TelemetrySample,
}

/// Request payload for single-sample ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IngestSampleRequest {
    pub device_id: Uuid,

    pub organization_id: Uuid,

    /// Observation timestamp in milliseconds since epoch.
    #[validate(custom(function = "shared::validation::validate_timestamp"))]
    pub timestamp: i64,

    pub running: bool,

    #[validate(custom(function = "shared::validation::validate_rpm"))]
    pub rpm: f64,
}

/// Request payload for batch ingestion.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchIngestRequest {
    #[validate(length(min = 1, max = 50, message = "Batch must contain 1-50 samples"))]
    pub samples: Vec<IngestSampleRequest>,
}

/// Reason a sample was dropped instead of aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// No shift window covers the sample's time of day (coverage gap).
    NoShiftWindow,
    /// The sample predates the device's last accepted sample.
    StaleSample,
}

impl DropReason {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::NoShiftWindow => "no_shift_window",
            DropReason::StaleSample => "stale_sample",
        }
    }
}

/// Response payload for single-sample ingestion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSampleResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DropReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<super::metric_bucket::BucketResponse>,
}

/// Per-sample drop detail for batch responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedSample {
    pub index: usize,
    pub reason: DropReason,
}

/// Response payload for batch ingestion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchIngestResponse {
    pub accepted_count: usize,
    pub dropped_count: usize,
    pub dropped: Vec<DroppedSample>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use validator::Validate;

    #[test]
    fn test_ingest_request_deserializes_camel_case() {
        let json = r#"{
            "deviceId": "550e8400-e29b-41d4-a716-446655440000",
            "organizationId": "650e8400-e29b-41d4-a716-446655440000",
            "timestamp": 1700000000000,
            "running": true,
            "rpm": 8400.5
        }"#;
        let req: IngestSampleRequest = serde_json::from_str(json).unwrap();
        assert!(req.running);
        assert_eq!(req.rpm, 8400.5);
    }

    #[test]
    fn test_ingest_request_validates_rpm() {
        let req = IngestSampleRequest {
            device_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            timestamp: Utc::now().timestamp_millis(),
            running: false,
            rpm: -1.0,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_batch_request_length_bounds() {
        let sample = IngestSampleRequest {
            device_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            timestamp: Utc::now().timestamp_millis(),
            running: true,
            rpm: 100.0,
        };

        let empty = BatchIngestRequest { samples: vec![] };
        assert!(empty.validate().is_err());

        let ok = BatchIngestRequest {
            samples: vec![sample.clone()],
        };
        assert!(ok.validate().is_ok());

        let too_many = BatchIngestRequest {
            samples: vec![sample; 51],
        };
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn test_drop_reason_labels() {
        assert_eq!(DropReason::NoShiftWindow.as_str(), "no_shift_window");
        assert_eq!(DropReason::StaleSample.as_str(), "stale_sample");
    }

    #[test]
    fn test_drop_reason_serializes_snake_case() {
        let json = serde_json::to_string(&DropReason::NoShiftWindow).unwrap();
        assert_eq!(json, "\"no_shift_window\"");
    }
}
