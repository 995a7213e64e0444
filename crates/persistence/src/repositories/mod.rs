//! Repository implementations for database operations.

pub mod device;
pub mod metric_bucket;
pub mod shift;

pub use device::DeviceRepository;
pub use metric_bucket::MetricBucketRepository;
pub use shift::ShiftRepository;
