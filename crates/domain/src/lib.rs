//! Domain layer for the Mill Metrics backend.
//!
//! This crate contains:
//! - Domain models (ShiftDefinition, TelemetrySample, MetricBucket, Device)
//! - Business logic services (shift schedule validation, metrics aggregation)
//! - Domain error types

pub mod models;
pub mod services;
