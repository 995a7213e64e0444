//! Domain services for the Mill Metrics backend.
//!
//! Services contain business logic that operates on domain models.

pub mod aggregation;
pub mod shift_schedule;

pub use aggregation::{Aggregator, AggregatorConfig};

pub use shift_schedule::{
    resolve_shift, shift_date_for, validate_window_set, ShiftValidationError,
};
