//! Read-time projection of raw shifts into display-ready records.

use serde::Serialize;

use super::domain::{Course, Shift};

/// Sentinel course name when the owning course cannot be resolved.
pub const UNKNOWN_COURSE_NAME: &str = "Unknown course";

/// Placeholder when a course has no abbreviation.
pub(crate) const MISSING_ABBREVIATION: &str = "N/A";

/// Occupancy flag derived from the registration counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyStatus {
    Available,
    Full,
}

impl OccupancyStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OccupancyStatus::Available => "Available",
            OccupancyStatus::Full => "Full",
        }
    }
}

/// Shift with defaults applied and course labeling resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedShift {
    #[serde(flatten)]
    pub shift: Shift,
    pub course_name: String,
    pub course_abbreviation: String,
    pub kind: String,
    pub current: u32,
    pub capacity: u32,
    pub status: OccupancyStatus,
    pub is_full: bool,
}

/// Project a raw shift. Total: a missing course yields the sentinel name
/// instead of an error, and absent numbers fall back to defaults.
pub fn enrich(shift: &Shift, course: Option<&Course>) -> EnrichedShift {
    let current = shift.registered();
    let capacity = shift.effective_capacity();
    let is_full = current >= capacity;
    let status = if is_full {
        OccupancyStatus::Full
    } else {
        OccupancyStatus::Available
    };

    let (course_name, course_abbreviation) = match course {
        Some(course) => (
            course.name.clone(),
            course
                .abbreviation
                .clone()
                .unwrap_or_else(|| MISSING_ABBREVIATION.to_string()),
        ),
        None => (
            UNKNOWN_COURSE_NAME.to_string(),
            MISSING_ABBREVIATION.to_string(),
        ),
    };

    EnrichedShift {
        shift: shift.clone(),
        course_name,
        course_abbreviation,
        kind: shift.effective_kind().to_string(),
        current,
        capacity,
        status,
        is_full,
    }
}
