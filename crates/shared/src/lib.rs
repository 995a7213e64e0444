//! Shared utilities and common types for the Mill Metrics backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Common validation logic for telemetry payloads
//! - Page/offset pagination helpers

pub mod pagination;
pub mod validation;
