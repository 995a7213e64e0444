//! Shift schedule validation and resolution.
//!
//! An organization carries up to three live shift windows. Windows are
//! half-open `[start, end)` intervals in minute-of-day space; a window whose
//! end is at or before its start wraps past midnight and is split into two
//! sub-intervals for the pairwise overlap check. Coverage gaps are legal:
//! a timestamp that no window covers resolves to `None` and the sample is
//! dropped upstream.

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use thiserror::Error;

use crate::models::shift::{ShiftDefinition, ShiftType};

/// Minutes in a full daily cycle.
pub const MINUTES_PER_DAY: u32 = 1440;

/// Maximum number of live shift definitions per organization.
pub const MAX_SHIFTS_PER_ORG: usize = 3;

/// Validation failures for shift window changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShiftValidationError {
    #[error("Organization already has {MAX_SHIFTS_PER_ORG} shift definitions")]
    LimitExceeded,

    #[error("Shift window must not be zero-length")]
    EmptyWindow,

    #[error("Shift window overlaps the existing {other} shift")]
    Overlap { other: ShiftType },

    #[error("Shift windows exceed the 24-hour daily budget")]
    BudgetExceeded,
}

/// A candidate window under validation, before it has a persisted identity.
#[derive(Debug, Clone, Copy)]
pub struct CandidateWindow {
    pub shift_type: ShiftType,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl CandidateWindow {
    fn start_minute(&self) -> u32 {
        self.start_time.hour() * 60 + self.start_time.minute()
    }

    fn end_minute(&self) -> u32 {
        self.end_time.hour() * 60 + self.end_time.minute()
    }
}

/// Half-open minute-of-day sub-intervals of a window, splitting wrap
/// windows at midnight.
fn sub_intervals(start: u32, end: u32) -> Vec<(u32, u32)> {
    if end > start {
        vec![(start, end)]
    } else {
        // Wraps midnight: tail of the day plus head of the next.
        let mut parts = vec![(start, MINUTES_PER_DAY)];
        if end > 0 {
            parts.push((0, end));
        }
        parts
    }
}

/// Total width of a window in minutes (wraparound-aware).
fn window_width(start: u32, end: u32) -> u32 {
    if end > start {
        end - start
    } else {
        MINUTES_PER_DAY - start + end
    }
}

fn intervals_intersect(a: (u32, u32), b: (u32, u32)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

/// Validates a candidate window against an organization's other live windows.
///
/// Checks, in order: the 3-shift limit, zero-length windows, pairwise
/// overlap (wraparound-aware), and the cumulative 24-hour budget. For
/// updates, pass the edited definition's id in `exclude` so the window is
/// validated against all OTHER live windows.
pub fn validate_window_set(
    existing: &[ShiftDefinition],
    candidate: &CandidateWindow,
    exclude: Option<uuid::Uuid>,
) -> Result<(), ShiftValidationError> {
    let others: Vec<&ShiftDefinition> = existing
        .iter()
        .filter(|s| Some(s.id) != exclude)
        .collect();

    if others.len() >= MAX_SHIFTS_PER_ORG {
        return Err(ShiftValidationError::LimitExceeded);
    }

    let start = candidate.start_minute();
    let end = candidate.end_minute();
    if start == end {
        return Err(ShiftValidationError::EmptyWindow);
    }

    let candidate_parts = sub_intervals(start, end);
    for other in &others {
        let other_parts = sub_intervals(other.start_minute(), other.end_minute());
        for a in &candidate_parts {
            for b in &other_parts {
                if intervals_intersect(*a, *b) {
                    return Err(ShiftValidationError::Overlap {
                        other: other.shift_type,
                    });
                }
            }
        }
    }

    let total: u32 = others
        .iter()
        .map(|s| window_width(s.start_minute(), s.end_minute()))
        .sum::<u32>()
        + window_width(start, end);
    if total > MINUTES_PER_DAY {
        return Err(ShiftValidationError::BudgetExceeded);
    }

    Ok(())
}

/// Resolves the live shift whose window contains the time-of-day of
/// `timestamp`, or `None` when the instant falls in a coverage gap.
pub fn resolve_shift<'a>(
    shifts: &'a [ShiftDefinition],
    timestamp: DateTime<Utc>,
) -> Option<&'a ShiftDefinition> {
    let minute = timestamp.hour() * 60 + timestamp.minute();
    shifts.iter().find(|s| {
        sub_intervals(s.start_minute(), s.end_minute())
            .iter()
            .any(|&(lo, hi)| minute >= lo && minute < hi)
    })
}

/// Computes the shift-date a sample belongs to.
///
/// The date anchors to the window START: a sample in the post-midnight tail
/// of a wrap window (e.g. 01:00 inside 22:00-06:00) attributes to the
/// previous calendar date.
pub fn shift_date_for(shift: &ShiftDefinition, timestamp: DateTime<Utc>) -> NaiveDate {
    let minute = timestamp.hour() * 60 + timestamp.minute();
    let date = timestamp.date_naive();
    if shift.wraps_midnight() && minute < shift.start_minute() {
        date.pred_opt().unwrap_or(date)
    } else {
        date
    }
}

/// Convenience wrapper used by the intake path: resolves the shift and the
/// shift-date in one step.
pub fn classify(
    shifts: &[ShiftDefinition],
    timestamp: DateTime<Utc>,
) -> Option<(uuid::Uuid, NaiveDate)> {
    resolve_shift(shifts, timestamp).map(|s| (s.id, shift_date_for(s, timestamp)))
}
