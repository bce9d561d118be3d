//! Room availability probes and conflict-set diffing.
//!
//! Hour windows are half-open: a shift ending at 10 and another starting at
//! 10 do not clash. Conflict records themselves are materialized by an
//! external detection pass; this module only reads and compares them.

use std::collections::HashSet;
use std::str::FromStr;

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::store::{Filter, ResourceStore, StoreError};

use super::catalog::Catalog;
use super::domain::{ClassroomId, Conflict, CourseId, RequestId, ShiftId, StudentId};
use super::enrichment::UNKNOWN_COURSE_NAME;

/// Half-open interval overlap. A shared boundary hour is not a clash.
pub(crate) const fn overlaps(from: u8, to: u8, other_from: u8, other_to: u8) -> bool {
    from < other_to && to > other_from
}

/// How prior and current conflicts are matched in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictDiffPolicy {
    /// Match by record id. A re-materialized identical conflict shows up as
    /// both resolved and created.
    #[default]
    Identity,
    /// Match by (student, sorted course set). Re-materialized identical
    /// conflicts cancel out.
    Signature,
}

impl FromStr for ConflictDiffPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "identity" | "id" => Ok(Self::Identity),
            "signature" | "content" => Ok(Self::Signature),
            other => Err(format!("unknown conflict diff policy '{other}'")),
        }
    }
}

/// Detail of the shift occupying a requested room window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomClash {
    pub shift_id: ShiftId,
    pub shift_name: Option<String>,
    pub course_id: CourseId,
    pub course_name: String,
    pub day: String,
    pub from: u8,
    pub to: u8,
}

/// Result of a room availability probe.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoomCheck {
    /// No overlapping shift and no undecided classroom request for the room.
    Free,
    /// An existing shift overlaps the window; the first match is reported.
    Occupied { clash: RoomClash },
    /// An undecided classroom request references the room. Coarse by intent:
    /// any pending request blocks the whole room until decided.
    AwaitingDecision { request_id: RequestId },
    /// A lookup failed, so the answer is unknown. Reported as unavailable
    /// rather than as an error.
    Indeterminate { detail: String },
}

impl RoomCheck {
    pub const fn is_available(&self) -> bool {
        matches!(self, RoomCheck::Free)
    }
}

/// Conflict with course names resolved best-effort.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictView {
    #[serde(flatten)]
    pub conflict: Conflict,
    pub course_names: Vec<String>,
}

/// Difference between a prior conflict snapshot and the current set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictDiff {
    pub resolved: Vec<ConflictView>,
    pub created: Vec<ConflictView>,
}

impl ConflictDiff {
    pub fn has_changes(&self) -> bool {
        !self.resolved.is_empty() || !self.created.is_empty()
    }
}

/// Room probes and conflict diffing over the catalog.
pub struct ConflictDetector<S> {
    catalog: Catalog<S>,
    diff_policy: ConflictDiffPolicy,
}

impl<S> Clone for ConflictDetector<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            diff_policy: self.diff_policy,
        }
    }
}

impl<S: ResourceStore> ConflictDetector<S> {
    pub fn new(catalog: Catalog<S>, diff_policy: ConflictDiffPolicy) -> Self {
        Self {
            catalog,
            diff_policy,
        }
    }

    /// Probe a room for a day and hour window.
    ///
    /// Lookup failures surface as [`RoomCheck::Indeterminate`], never as an
    /// error; callers treating unknown as unavailable is the safe default.
    pub async fn check_room(
        &self,
        room: &ClassroomId,
        day: &str,
        from: u8,
        to: u8,
    ) -> RoomCheck {
        let shifts = match self.catalog.shifts_for_room_on_day(room, day).await {
            Ok(shifts) => shifts,
            Err(error) => {
                warn!(room = %room, %error, "room availability lookup failed");
                return RoomCheck::Indeterminate {
                    detail: error.to_string(),
                };
            }
        };

        for shift in shifts {
            if overlaps(from, to, shift.from, shift.to) {
                let course_name = match self.catalog.course(&shift.course_id).await {
                    Ok(course) => course.name,
                    Err(_) => UNKNOWN_COURSE_NAME.to_string(),
                };
                return RoomCheck::Occupied {
                    clash: RoomClash {
                        shift_id: shift.id,
                        shift_name: shift.name,
                        course_id: shift.course_id,
                        course_name,
                        day: shift.day,
                        from: shift.from,
                        to: shift.to,
                    },
                };
            }
        }

        match self.pending_room_request(room).await {
            Ok(Some(request_id)) => RoomCheck::AwaitingDecision { request_id },
            Ok(None) => RoomCheck::Free,
            Err(error) => {
                warn!(room = %room, %error, "pending classroom request lookup failed");
                RoomCheck::Indeterminate {
                    detail: error.to_string(),
                }
            }
        }
    }

    async fn pending_room_request(
        &self,
        room: &ClassroomId,
    ) -> Result<Option<RequestId>, StoreError> {
        let pending = self
            .catalog
            .classroom_requests(&[
                Filter::eq("classroomId", room.0.as_str()),
                Filter::eq("response", Value::Null),
            ])
            .await?;
        Ok(pending.into_iter().next().map(|request| request.id))
    }

    /// Diff the student's current conflict set against a caller-held prior
    /// snapshot. `resolved` is prior-only, `created` is current-only, per the
    /// configured matching policy.
    pub async fn diff_conflicts(
        &self,
        student: &StudentId,
        prior: &[Conflict],
    ) -> Result<ConflictDiff, StoreError> {
        let current = self.catalog.conflicts_for_student(student).await?;

        let (resolved, created) = match self.diff_policy {
            ConflictDiffPolicy::Identity => {
                let current_ids: HashSet<&str> =
                    current.iter().map(|conflict| conflict.id.as_str()).collect();
                let prior_ids: HashSet<&str> =
                    prior.iter().map(|conflict| conflict.id.as_str()).collect();
                let resolved: Vec<Conflict> = prior
                    .iter()
                    .filter(|conflict| !current_ids.contains(conflict.id.as_str()))
                    .cloned()
                    .collect();
                let created: Vec<Conflict> = current
                    .iter()
                    .filter(|conflict| !prior_ids.contains(conflict.id.as_str()))
                    .cloned()
                    .collect();
                (resolved, created)
            }
            ConflictDiffPolicy::Signature => {
                let current_sigs: HashSet<String> = current.iter().map(signature).collect();
                let prior_sigs: HashSet<String> = prior.iter().map(signature).collect();
                let resolved: Vec<Conflict> = prior
                    .iter()
                    .filter(|conflict| !current_sigs.contains(&signature(conflict)))
                    .cloned()
                    .collect();
                let created: Vec<Conflict> = current
                    .iter()
                    .filter(|conflict| !prior_sigs.contains(&signature(conflict)))
                    .cloned()
                    .collect();
                (resolved, created)
            }
        };

        Ok(ConflictDiff {
            resolved: self.with_course_names(resolved).await,
            created: self.with_course_names(created).await,
        })
    }

    /// Course ids implicated in any current conflict of the student.
    pub async fn conflicted_course_ids(
        &self,
        student: &StudentId,
    ) -> Result<HashSet<CourseId>, StoreError> {
        let conflicts = self.catalog.conflicts_for_student(student).await?;
        Ok(conflicts
            .into_iter()
            .flat_map(|conflict| conflict.course_ids)
            .collect())
    }

    async fn with_course_names(&self, conflicts: Vec<Conflict>) -> Vec<ConflictView> {
        let mut views = Vec::with_capacity(conflicts.len());
        for conflict in conflicts {
            let lookups = conflict
                .course_ids
                .iter()
                .map(|course| self.catalog.course(course));
            let names: Vec<String> = join_all(lookups)
                .await
                .into_iter()
                .zip(&conflict.course_ids)
                .map(|(result, id)| match result {
                    Ok(course) => course.name,
                    Err(_) => format!("Course {id}"),
                })
                .collect();
            views.push(ConflictView {
                conflict,
                course_names: names,
            });
        }
        views
    }
}

/// Order-insensitive content key for a conflict.
fn signature(conflict: &Conflict) -> String {
    let mut courses: Vec<&str> = conflict
        .course_ids
        .iter()
        .map(|course| course.0.as_str())
        .collect();
    courses.sort_unstable();
    format!("{}|{}", conflict.student_id, courses.join(","))
}
