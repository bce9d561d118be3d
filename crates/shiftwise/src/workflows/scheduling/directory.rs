//! Read models stitched from the catalog for the surrounding views.
//!
//! Listings here degrade per item: a broken secondary reference is skipped
//! with a warning while the primary fetch still propagates failure.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use serde::Serialize;
use tracing::warn;

use crate::store::{ResourceStore, StoreError};

use super::catalog::Catalog;
use super::conflicts::ConflictDetector;
use super::domain::{ClassroomId, CourseId, Shift, ShiftId, StudentId};
use super::enrichment::MISSING_ABBREVIATION;

/// Row of a student's personal timetable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub shift_id: ShiftId,
    pub course_id: CourseId,
    pub course_name: String,
    pub course_abbreviation: String,
    pub shift_name: Option<String>,
    pub kind: String,
    pub day: String,
    pub from: u8,
    pub to: u8,
    pub room: String,
}

/// Enrolled course with its conflict flag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentEntry {
    pub course_id: CourseId,
    pub name: String,
    pub abbreviation: String,
    pub has_conflict: bool,
}

/// Student allocated to a shift.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub student_id: StudentId,
    pub name: String,
    pub email: String,
    pub special_status: bool,
}

/// Enrolled student eligible to join a shift, with their current same-type
/// assignment when one exists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEntry {
    pub student_id: StudentId,
    pub name: String,
    pub email: String,
    pub special_status: bool,
    pub current_shift_id: Option<ShiftId>,
    pub current_shift_name: Option<String>,
}

/// Classroom with building label and occupancy flag.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomOccupancy {
    pub classroom_id: ClassroomId,
    pub name: String,
    pub building: String,
    pub occupied: bool,
}

pub struct Directory<S> {
    catalog: Catalog<S>,
    conflicts: ConflictDetector<S>,
}

impl<S> Clone for Directory<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            conflicts: self.conflicts.clone(),
        }
    }
}

impl<S: ResourceStore> Directory<S> {
    pub fn new(catalog: Catalog<S>, conflicts: ConflictDetector<S>) -> Self {
        Self { catalog, conflicts }
    }

    /// A student's timetable from their live allocations.
    pub async fn student_schedule(
        &self,
        student: &StudentId,
    ) -> Result<Vec<ScheduleEntry>, StoreError> {
        let allocations = self.catalog.allocations_for_student(student).await?;
        let lookups = allocations
            .iter()
            .map(|allocation| self.catalog.enriched_shift(&allocation.shift_id));
        let shifts = join_all(lookups).await;

        let mut entries = Vec::new();
        for (allocation, result) in allocations.iter().zip(shifts) {
            let enriched = match result {
                Ok(enriched) => enriched,
                Err(error) => {
                    warn!(
                        allocation = %allocation.id,
                        %error,
                        "allocation references an unreadable shift; skipping"
                    );
                    continue;
                }
            };
            let room = self.room_label(enriched.shift.classroom_id.as_ref()).await;
            entries.push(ScheduleEntry {
                shift_id: enriched.shift.id.clone(),
                course_id: enriched.shift.course_id.clone(),
                course_name: enriched.course_name,
                course_abbreviation: enriched.course_abbreviation,
                shift_name: enriched.shift.name.clone(),
                kind: enriched.kind,
                day: enriched.shift.day.clone(),
                from: enriched.shift.from,
                to: enriched.shift.to,
                room,
            });
        }
        Ok(entries)
    }

    /// A student's enrolled courses, flagging those in a current conflict.
    pub async fn enrollments(
        &self,
        student: &StudentId,
    ) -> Result<Vec<EnrollmentEntry>, StoreError> {
        let record = self.catalog.student(student).await?;
        let flagged = match self.conflicts.conflicted_course_ids(student).await {
            Ok(flagged) => flagged,
            Err(error) => {
                warn!(student = %student, %error, "conflict lookup failed; flags omitted");
                HashSet::new()
            }
        };

        let lookups = record.enrolled.iter().map(|course| self.catalog.course(course));
        let courses = join_all(lookups).await;

        let mut entries = Vec::new();
        for (course_id, result) in record.enrolled.iter().zip(courses) {
            let (name, abbreviation) = match result {
                Ok(course) => (
                    course.name,
                    course
                        .abbreviation
                        .unwrap_or_else(|| MISSING_ABBREVIATION.to_string()),
                ),
                Err(_) => (
                    format!("Course {course_id}"),
                    MISSING_ABBREVIATION.to_string(),
                ),
            };
            entries.push(EnrollmentEntry {
                course_id: course_id.clone(),
                name,
                abbreviation,
                has_conflict: flagged.contains(course_id),
            });
        }
        Ok(entries)
    }

    /// Students currently allocated to a shift.
    pub async fn shift_roster(&self, shift: &ShiftId) -> Result<Vec<RosterEntry>, StoreError> {
        self.catalog.shift(shift).await?;
        let allocations = self.catalog.allocations_for_shift(shift).await?;
        let lookups = allocations
            .iter()
            .map(|allocation| self.catalog.student(&allocation.student_id));
        let students = join_all(lookups).await;

        let mut entries = Vec::new();
        for (allocation, result) in allocations.iter().zip(students) {
            match result {
                Ok(student) => entries.push(RosterEntry {
                    student_id: student.id,
                    name: student.name,
                    email: student.email,
                    special_status: student.special_status,
                }),
                Err(error) => {
                    warn!(
                        allocation = %allocation.id,
                        %error,
                        "allocation references an unreadable student; skipping"
                    );
                }
            }
        }
        Ok(entries)
    }

    /// Students enrolled in the shift's course but not allocated to it.
    pub async fn shift_candidates(
        &self,
        shift_id: &ShiftId,
    ) -> Result<Vec<CandidateEntry>, StoreError> {
        let target = self.catalog.shift(shift_id).await?;
        let students = self.catalog.students().await?;
        let allocated: HashSet<String> = self
            .catalog
            .allocations_for_shift(shift_id)
            .await?
            .into_iter()
            .map(|allocation| allocation.student_id.0)
            .collect();

        let mut entries = Vec::new();
        for student in students {
            if !student.enrolled.contains(&target.course_id) || allocated.contains(&student.id.0) {
                continue;
            }
            let current = self.current_assignment(&student.id, &target).await;
            entries.push(CandidateEntry {
                student_id: student.id,
                name: student.name,
                email: student.email,
                special_status: student.special_status,
                current_shift_id: current.as_ref().map(|shift| shift.id.clone()),
                current_shift_name: current.and_then(|shift| shift.name),
            });
        }
        Ok(entries)
    }

    /// All classrooms with building labels and an occupied flag.
    pub async fn classroom_occupancy(&self) -> Result<Vec<ClassroomOccupancy>, StoreError> {
        let classrooms = self.catalog.classrooms().await?;
        let buildings = match self.catalog.buildings().await {
            Ok(buildings) => buildings,
            Err(error) => {
                warn!(%error, "building lookup failed; labels omitted");
                Vec::new()
            }
        };
        let shifts = match self.catalog.shifts().await {
            Ok(shifts) => shifts,
            Err(error) => {
                warn!(%error, "shift lookup failed; occupancy flags omitted");
                Vec::new()
            }
        };

        let occupied: HashSet<&str> = shifts
            .iter()
            .filter_map(|shift| shift.classroom_id.as_ref())
            .map(|room| room.0.as_str())
            .collect();
        let building_labels: HashMap<&str, String> = buildings
            .iter()
            .map(|building| {
                let label = building
                    .abbreviation
                    .clone()
                    .unwrap_or_else(|| building.name.clone());
                (building.id.as_str(), label)
            })
            .collect();

        let mut entries = Vec::new();
        for classroom in classrooms {
            let building = classroom
                .building_id
                .as_deref()
                .and_then(|id| building_labels.get(id).cloned())
                .unwrap_or_else(|| MISSING_ABBREVIATION.to_string());
            let is_occupied = occupied.contains(classroom.id.0.as_str());
            entries.push(ClassroomOccupancy {
                name: classroom
                    .name
                    .unwrap_or_else(|| format!("Room {}", classroom.id)),
                classroom_id: classroom.id,
                building,
                occupied: is_occupied,
            });
        }
        Ok(entries)
    }

    /// The student's existing shift matching the target's (course, type), if
    /// any.
    async fn current_assignment(&self, student: &StudentId, target: &Shift) -> Option<Shift> {
        let allocations = self.catalog.allocations_for_student(student).await.ok()?;
        for allocation in allocations {
            let Ok(shift) = self.catalog.shift(&allocation.shift_id).await else {
                continue;
            };
            if shift.course_id == target.course_id
                && shift.effective_kind() == target.effective_kind()
                && shift.id != target.id
            {
                return Some(shift);
            }
        }
        None
    }

    async fn room_label(&self, room: Option<&ClassroomId>) -> String {
        let Some(room) = room else {
            return "Unassigned".to_string();
        };
        match self.catalog.classroom(room).await {
            Ok(classroom) => classroom
                .name
                .unwrap_or_else(|| format!("Room {room}")),
            Err(_) => format!("Room {room}"),
        }
    }
}
