//! HTTP route handlers.

pub mod devices;
pub mod efficiency;
pub mod health;
pub mod shifts;
pub mod telemetry;
