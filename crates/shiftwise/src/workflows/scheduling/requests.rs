//! Change-request lifecycle: submission, director decision, side effects.
//!
//! A request is pending until its response field is set, and a response is
//! terminal. The response is persisted before any side effect runs, so a
//! decision survives an effect failure; the failed effect is flagged on the
//! record and can be retried later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::{Collection, Filter, ResourceStore, StoreError};

use super::allocation::Allocator;
use super::catalog::Catalog;
use super::conflicts::{ConflictDetector, RoomCheck};
use super::domain::{
    ClassroomId, ClassroomRequest, Decision, Identity, RequestId, RequestState, ShiftId,
    ShiftRequest, StudentId, TeacherId,
};

/// Submission payload for a shift change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftChangeSubmission {
    pub student_id: StudentId,
    pub shift_id: ShiftId,
    #[serde(default)]
    pub alternative_shift_id: Option<ShiftId>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Submission payload for a classroom change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomChangeSubmission {
    pub teacher_id: TeacherId,
    pub classroom_id: ClassroomId,
    pub shift_id: ShiftId,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Side-effect status after a decision or retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EffectStatus {
    /// Rejected, or approved with nothing to apply.
    NotRequired,
    Applied,
    /// Approved but the effect failed; flagged on the record for retry.
    Pending { detail: String },
}

/// A decided or retried request together with what its effect did.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome<R> {
    pub request: R,
    pub effect: EffectStatus,
}

/// Approved requests whose side effect has not landed yet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingEffects {
    pub shift_requests: Vec<ShiftRequest>,
    pub classroom_requests: Vec<ClassroomRequest>,
}

/// Tag distinguishing the two request collections in mixed listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    ShiftChange,
    ClassroomChange,
}

/// Row in the per-identity request overview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    pub id: RequestId,
    pub kind: RequestKind,
    pub state: RequestState,
    pub requester: String,
    pub shift_label: String,
    pub date: DateTime<Utc>,
    pub reason: Option<String>,
    pub effect_pending: bool,
}

/// Errors raised by the request workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("request {0} is already decided")]
    AlreadyDecided(RequestId),
    #[error("request {0} has no pending effect to retry")]
    NoPendingEffect(RequestId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct RequestWorkflow<S> {
    catalog: Catalog<S>,
    allocator: Allocator<S>,
    rooms: ConflictDetector<S>,
}

impl<S> Clone for RequestWorkflow<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            allocator: self.allocator.clone(),
            rooms: self.rooms.clone(),
        }
    }
}

impl<S: ResourceStore> RequestWorkflow<S> {
    pub fn new(catalog: Catalog<S>, allocator: Allocator<S>, rooms: ConflictDetector<S>) -> Self {
        Self {
            catalog,
            allocator,
            rooms,
        }
    }

    /// File a shift-change request. It enters the queue pending.
    pub async fn submit_shift_change(
        &self,
        submission: ShiftChangeSubmission,
    ) -> Result<ShiftRequest, WorkflowError> {
        let request = self
            .catalog
            .create_numbered(Collection::ShiftRequests, |id| ShiftRequest {
                id: RequestId(id),
                student_id: submission.student_id,
                shift_id: submission.shift_id,
                alternative_shift_id: submission.alternative_shift_id,
                reason: submission.reason,
                response: None,
                response_seen_by_student: false,
                date: Utc::now(),
                effect_pending: false,
            })
            .await?;
        info!(request = %request.id, student = %request.student_id, "shift change request filed");
        Ok(request)
    }

    /// File a classroom-change request. It enters the queue pending.
    pub async fn submit_classroom_change(
        &self,
        submission: ClassroomChangeSubmission,
    ) -> Result<ClassroomRequest, WorkflowError> {
        let request = self
            .catalog
            .create_numbered(Collection::ClassroomRequests, |id| ClassroomRequest {
                id: RequestId(id),
                teacher_id: submission.teacher_id,
                classroom_id: submission.classroom_id,
                shift_id: submission.shift_id,
                reason: submission.reason,
                response: None,
                response_seen_by_teacher: false,
                date: Utc::now(),
                effect_pending: false,
            })
            .await?;
        info!(request = %request.id, teacher = %request.teacher_id, "classroom change request filed");
        Ok(request)
    }

    /// Decide a pending shift-change request.
    ///
    /// Approval with an alternative shift allocates the student into it. The
    /// decision is persisted first; an effect failure flags the record rather
    /// than undoing anything.
    pub async fn decide_shift_request(
        &self,
        id: &RequestId,
        decision: Decision,
    ) -> Result<DecisionOutcome<ShiftRequest>, WorkflowError> {
        let mut request = self.catalog.shift_request(id).await?;
        if request.state().is_terminal() {
            return Err(WorkflowError::AlreadyDecided(id.clone()));
        }

        request.response = Some(decision.response());
        self.catalog
            .replace(Collection::ShiftRequests, &request.id.0, &request)
            .await?;
        info!(request = %request.id, decision = decision.label(), "shift change request decided");

        if decision == Decision::Rejected {
            return Ok(DecisionOutcome {
                request,
                effect: EffectStatus::NotRequired,
            });
        }

        let effect = self.apply_shift_effect(&request).await;
        if matches!(effect, EffectStatus::Pending { .. }) {
            request.effect_pending = true;
            if let Err(error) = self
                .catalog
                .replace(Collection::ShiftRequests, &request.id.0, &request)
                .await
            {
                warn!(request = %request.id, %error, "failed to flag pending effect");
            }
        }
        Ok(DecisionOutcome { request, effect })
    }

    /// Decide a pending classroom-change request.
    ///
    /// Approval re-checks the room against the shift's own window, then moves
    /// the shift by rewriting its raw record only.
    pub async fn decide_classroom_request(
        &self,
        id: &RequestId,
        decision: Decision,
    ) -> Result<DecisionOutcome<ClassroomRequest>, WorkflowError> {
        let mut request = self.catalog.classroom_request(id).await?;
        if request.state().is_terminal() {
            return Err(WorkflowError::AlreadyDecided(id.clone()));
        }

        request.response = Some(decision.response());
        self.catalog
            .replace(Collection::ClassroomRequests, &request.id.0, &request)
            .await?;
        info!(request = %request.id, decision = decision.label(), "classroom change request decided");

        if decision == Decision::Rejected {
            return Ok(DecisionOutcome {
                request,
                effect: EffectStatus::NotRequired,
            });
        }

        let effect = self.apply_classroom_effect(&request).await;
        if matches!(effect, EffectStatus::Pending { .. }) {
            request.effect_pending = true;
            if let Err(error) = self
                .catalog
                .replace(Collection::ClassroomRequests, &request.id.0, &request)
                .await
            {
                warn!(request = %request.id, %error, "failed to flag pending effect");
            }
        }
        Ok(DecisionOutcome { request, effect })
    }

    /// Re-run the side effect of an approved shift request flagged pending.
    pub async fn retry_shift_effect(
        &self,
        id: &RequestId,
    ) -> Result<DecisionOutcome<ShiftRequest>, WorkflowError> {
        let mut request = self.catalog.shift_request(id).await?;
        if request.state() != RequestState::Approved || !request.effect_pending {
            return Err(WorkflowError::NoPendingEffect(id.clone()));
        }

        let effect = self.apply_shift_effect(&request).await;
        if !matches!(effect, EffectStatus::Pending { .. }) {
            request.effect_pending = false;
            self.catalog
                .replace(Collection::ShiftRequests, &request.id.0, &request)
                .await?;
            info!(request = %request.id, "pending shift change effect applied");
        }
        Ok(DecisionOutcome { request, effect })
    }

    /// Re-run the side effect of an approved classroom request flagged
    /// pending.
    pub async fn retry_classroom_effect(
        &self,
        id: &RequestId,
    ) -> Result<DecisionOutcome<ClassroomRequest>, WorkflowError> {
        let mut request = self.catalog.classroom_request(id).await?;
        if request.state() != RequestState::Approved || !request.effect_pending {
            return Err(WorkflowError::NoPendingEffect(id.clone()));
        }

        let effect = self.apply_classroom_effect(&request).await;
        if !matches!(effect, EffectStatus::Pending { .. }) {
            request.effect_pending = false;
            self.catalog
                .replace(Collection::ClassroomRequests, &request.id.0, &request)
                .await?;
            info!(request = %request.id, "pending classroom change effect applied");
        }
        Ok(DecisionOutcome { request, effect })
    }

    /// Approved requests still waiting for their side effect.
    pub async fn pending_effects(&self) -> Result<PendingEffects, WorkflowError> {
        let shift_requests = self
            .catalog
            .shift_requests(&[Filter::eq("effectPending", true)])
            .await?;
        let classroom_requests = self
            .catalog
            .classroom_requests(&[Filter::eq("effectPending", true)])
            .await?;
        Ok(PendingEffects {
            shift_requests,
            classroom_requests,
        })
    }

    /// Requests visible to an identity: directors see everything, students
    /// and teachers their own records. Labels resolve best-effort and degrade
    /// to ids.
    pub async fn overview(&self, identity: &Identity) -> Result<Vec<RequestSummary>, WorkflowError> {
        let (shift_requests, classroom_requests) = match identity {
            Identity::Director => (
                self.catalog.shift_requests(&[]).await?,
                self.catalog.classroom_requests(&[]).await?,
            ),
            Identity::Student(student) => (
                self.catalog
                    .shift_requests(&[Filter::eq("studentId", student.0.as_str())])
                    .await?,
                Vec::new(),
            ),
            Identity::Teacher(teacher) => (
                Vec::new(),
                self.catalog
                    .classroom_requests(&[Filter::eq("teacherId", teacher.0.as_str())])
                    .await?,
            ),
        };

        let mut summaries = Vec::new();
        for request in shift_requests {
            summaries.push(self.summarize_shift_request(request).await);
        }
        for request in classroom_requests {
            summaries.push(self.summarize_classroom_request(request).await);
        }
        summaries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(summaries)
    }

    async fn apply_shift_effect(&self, request: &ShiftRequest) -> EffectStatus {
        let Some(alternative) = &request.alternative_shift_id else {
            return EffectStatus::NotRequired;
        };
        match self.allocator.allocate(&request.student_id, alternative).await {
            Ok(_) => EffectStatus::Applied,
            Err(error) => {
                warn!(request = %request.id, %error, "approved shift change failed to apply");
                EffectStatus::Pending {
                    detail: error.to_string(),
                }
            }
        }
    }

    async fn apply_classroom_effect(&self, request: &ClassroomRequest) -> EffectStatus {
        let mut shift = match self.catalog.shift(&request.shift_id).await {
            Ok(shift) => shift,
            Err(error) => {
                warn!(request = %request.id, %error, "classroom change target shift unavailable");
                return EffectStatus::Pending {
                    detail: error.to_string(),
                };
            }
        };

        let check = self
            .rooms
            .check_room(&request.classroom_id, &shift.day, shift.from, shift.to)
            .await;
        if !check.is_available() {
            warn!(
                request = %request.id,
                room = %request.classroom_id,
                "requested classroom is not free"
            );
            return EffectStatus::Pending {
                detail: describe_room_check(&check),
            };
        }

        shift.classroom_id = Some(request.classroom_id.clone());
        match self.catalog.save_shift(&shift).await {
            Ok(()) => EffectStatus::Applied,
            Err(error) => {
                warn!(request = %request.id, %error, "classroom change write failed");
                EffectStatus::Pending {
                    detail: error.to_string(),
                }
            }
        }
    }

    async fn summarize_shift_request(&self, request: ShiftRequest) -> RequestSummary {
        let state = request.state();
        let requester = match self.catalog.student(&request.student_id).await {
            Ok(student) => student.name,
            Err(_) => request.student_id.0.clone(),
        };
        let shift_label = self.shift_label(&request.shift_id).await;
        RequestSummary {
            id: request.id,
            kind: RequestKind::ShiftChange,
            state,
            requester,
            shift_label,
            date: request.date,
            reason: request.reason,
            effect_pending: request.effect_pending,
        }
    }

    async fn summarize_classroom_request(&self, request: ClassroomRequest) -> RequestSummary {
        let state = request.state();
        let requester = match self.catalog.teacher(&request.teacher_id).await {
            Ok(teacher) => teacher.name,
            Err(_) => request.teacher_id.0.clone(),
        };
        let shift_label = self.shift_label(&request.shift_id).await;
        RequestSummary {
            id: request.id,
            kind: RequestKind::ClassroomChange,
            state,
            requester,
            shift_label,
            date: request.date,
            reason: request.reason,
            effect_pending: request.effect_pending,
        }
    }

    async fn shift_label(&self, shift: &ShiftId) -> String {
        match self.catalog.enriched_shift(shift).await {
            Ok(enriched) => {
                let name = enriched
                    .shift
                    .name
                    .clone()
                    .unwrap_or_else(|| enriched.shift.id.0.clone());
                format!("{} {}", enriched.course_name, name)
            }
            Err(_) => shift.0.clone(),
        }
    }
}

fn describe_room_check(check: &RoomCheck) -> String {
    match check {
        RoomCheck::Free => "room is free".to_string(),
        RoomCheck::Occupied { clash } => format!(
            "room occupied by shift {} ({} {}-{})",
            clash.shift_id, clash.day, clash.from, clash.to
        ),
        RoomCheck::AwaitingDecision { request_id } => {
            format!("room has undecided classroom request {request_id}")
        }
        RoomCheck::Indeterminate { detail } => format!("room availability unknown: {detail}"),
    }
}
