//! Database entity definitions (row mappings).

pub mod device;
pub mod metric_bucket;
pub mod shift;

pub use device::DeviceEntity;
pub use metric_bucket::{EfficiencyRowEntity, MetricBucketEntity};
pub use shift::ShiftEntity;
