//! Domain models for the Mill Metrics backend.

pub mod device;
pub mod metric_bucket;
pub mod shift;
pub mod telemetry;

pub use device::Device;
pub use metric_bucket::{BucketKey, BucketSnapshot};
pub use shift::{ShiftDefinition, ShiftType};
pub use telemetry::{ClassifiedSample, TelemetrySample};
