//! Background jobs.

pub mod flush_buckets;
pub mod pool_metrics;
pub mod purge_buckets;
pub mod scheduler;
