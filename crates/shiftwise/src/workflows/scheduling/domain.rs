//! Persisted record shapes and the identity model for scheduling.
//!
//! Field names serialize in the camelCase layout of the backing collections.
//! Records carry only raw fields; display and occupancy projections live in
//! the enrichment module and are never written back.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for student records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier wrapper for courses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseId(pub String);

/// Identifier wrapper for shifts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShiftId(pub String);

/// Identifier wrapper for classrooms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassroomId(pub String);

/// Identifier wrapper for teachers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TeacherId(pub String);

/// Identifier wrapper for change requests of either kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ShiftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ClassroomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TeacherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role attached to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Director,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Director => "director",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Caller-supplied identity for role-scoped operations.
///
/// Every feed and overview takes one of these explicitly; the engine holds no
/// ambient notion of who is logged in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Student(StudentId),
    Teacher(TeacherId),
    Director,
}

impl Identity {
    pub const fn role(&self) -> Role {
        match self {
            Identity::Student(_) => Role::Student,
            Identity::Teacher(_) => Role::Teacher,
            Identity::Director => Role::Director,
        }
    }
}

/// Fallback capacity when a shift record carries none.
pub const DEFAULT_SHIFT_CAPACITY: u32 = 25;

/// Fallback shift type when a shift record carries none.
pub const DEFAULT_SHIFT_KIND: &str = "Theoretical-Practical";

/// Subtype tag on stored notification records.
pub const SCHEDULE_UPDATE_KIND: &str = "schedule_update";

/// Student record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub enrolled: Vec<CourseId>,
    #[serde(default)]
    pub special_status: bool,
}

/// Course record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

/// Raw shift record as stored. Occupancy numbers here are authoritative but
/// unlabeled; use the enrichment module for anything user-facing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: ShiftId,
    pub course_id: CourseId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub day: String,
    pub from: u8,
    pub to: u8,
    #[serde(default)]
    pub classroom_id: Option<ClassroomId>,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub total_students_registered: Option<u32>,
}

impl Shift {
    /// Shift type with the default applied. Exclusivity matches on this value.
    pub fn effective_kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(DEFAULT_SHIFT_KIND)
    }

    pub fn effective_capacity(&self) -> u32 {
        self.capacity.unwrap_or(DEFAULT_SHIFT_CAPACITY)
    }

    pub fn registered(&self) -> u32 {
        self.total_students_registered.unwrap_or(0)
    }
}

/// Student-to-shift assignment. Created and destroyed only by the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub id: String,
    pub student_id: StudentId,
    pub shift_id: ShiftId,
}

/// Classroom record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub id: ClassroomId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub building_id: Option<String>,
}

/// Building record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Building {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub abbreviation: Option<String>,
}

/// Teacher record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Degree program record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Degree {
    pub id: String,
    pub name: String,
}

/// Decision recorded on a request. Terminal once set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestResponse {
    Ok,
    Rejected,
}

/// Lifecycle state derived from the stored response field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Pending,
    Approved,
    Rejected,
}

impl RequestState {
    pub const fn label(self) -> &'static str {
        match self {
            RequestState::Pending => "pending",
            RequestState::Approved => "approved",
            RequestState::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, RequestState::Pending)
    }
}

/// Director verdict on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub const fn response(self) -> RequestResponse {
        match self {
            Decision::Approved => RequestResponse::Ok,
            Decision::Rejected => RequestResponse::Rejected,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
        }
    }
}

/// Student request to move between shifts of a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftRequest {
    pub id: RequestId,
    pub student_id: StudentId,
    pub shift_id: ShiftId,
    #[serde(default)]
    pub alternative_shift_id: Option<ShiftId>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub response: Option<RequestResponse>,
    #[serde(default)]
    pub response_seen_by_student: bool,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub effect_pending: bool,
}

impl ShiftRequest {
    pub fn state(&self) -> RequestState {
        request_state(self.response)
    }
}

/// Teacher request to move a shift into a different classroom.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomRequest {
    pub id: RequestId,
    pub teacher_id: TeacherId,
    pub classroom_id: ClassroomId,
    pub shift_id: ShiftId,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub response: Option<RequestResponse>,
    #[serde(default)]
    pub response_seen_by_teacher: bool,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub effect_pending: bool,
}

impl ClassroomRequest {
    pub fn state(&self) -> RequestState {
        request_state(self.response)
    }
}

fn request_state(response: Option<RequestResponse>) -> RequestState {
    match response {
        None => RequestState::Pending,
        Some(RequestResponse::Ok) => RequestState::Approved,
        Some(RequestResponse::Rejected) => RequestState::Rejected,
    }
}

/// Conflict record materialized by an external detection pass. The engine
/// reads and diffs these but never writes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: String,
    pub student_id: StudentId,
    #[serde(rename = "courseIDs", default)]
    pub course_ids: Vec<CourseId>,
    pub timestamp: DateTime<Utc>,
}

/// Persisted schedule-update notice, the one notification subtype with its
/// own records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleNotice {
    pub id: String,
    pub student_id: StudentId,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}
