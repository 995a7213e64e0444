//! Common validation utilities for telemetry payloads.

use chrono::{TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// Maximum age of a sample timestamp in days (7 days).
const MAX_TIMESTAMP_AGE_DAYS: i64 = 7;

/// Maximum allowed future timestamp tolerance in seconds (5 minutes for clock skew).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 300;

/// Plausibility cap for machine spindle speed in RPM.
const MAX_PLAUSIBLE_RPM: f64 = 60_000.0;

lazy_static! {
    /// Device names start with an alphanumeric character and may contain
    /// spaces, hyphens, underscores, and dots (2-50 characters total).
    static ref DEVICE_NAME_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 ._-]{1,49}$").expect("valid device name regex");
}

/// Validates that an RPM reading is non-negative and within the plausible range.
pub fn validate_rpm(rpm: f64) -> Result<(), ValidationError> {
    if (0.0..=MAX_PLAUSIBLE_RPM).contains(&rpm) {
        Ok(())
    } else {
        let mut err = ValidationError::new("rpm_range");
        err.message = Some("RPM must be between 0 and 60000".into());
        Err(err)
    }
}

/// Validates a device display name against the allowed pattern.
pub fn validate_device_name(name: &str) -> Result<(), ValidationError> {
    if DEVICE_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invalid_device_name");
        err.message = Some(
            "Device name must be 2-50 characters: letters, digits, spaces, dots, hyphens, underscores".into(),
        );
        Err(err)
    }
}

/// Validates that a timestamp (in milliseconds since epoch) is within acceptable range.
/// - Must not be more than 5 minutes in the future (allows for clock skew)
/// - Must not be older than 7 days
pub fn validate_timestamp(timestamp_millis: i64) -> Result<(), ValidationError> {
    let now = Utc::now();

    let timestamp = match Utc.timestamp_millis_opt(timestamp_millis).single() {
        Some(ts) => ts,
        None => {
            let mut err = ValidationError::new("timestamp_invalid");
            err.message = Some("Invalid timestamp format".into());
            return Err(err);
        }
    };

    let future_limit = now + chrono::Duration::seconds(MAX_FUTURE_TOLERANCE_SECS);
    if timestamp > future_limit {
        let mut err = ValidationError::new("timestamp_future");
        err.message = Some("Timestamp cannot be in the future".into());
        return Err(err);
    }

    let past_limit = now - chrono::Duration::days(MAX_TIMESTAMP_AGE_DAYS);
    if timestamp < past_limit {
        let mut err = ValidationError::new("timestamp_old");
        err.message = Some("Timestamp cannot be older than 7 days".into());
        return Err(err);
    }

    Ok(())
}
