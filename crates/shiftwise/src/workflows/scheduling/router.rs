//! HTTP surface for the scheduling engine.
//!
//! Handlers stay thin: decode, call the service, map the error variant to a
//! status. Identity comes in as explicit `role`/`userId` parameters on the
//! operations that are scoped to a caller.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::store::{ResourceStore, StoreError};

use super::allocation::AllocationError;
use super::domain::{
    ClassroomId, Conflict, Decision, Identity, RequestId, Role, ShiftId, StudentId, TeacherId,
};
use super::notifications::NotificationError;
use super::requests::{ClassroomChangeSubmission, ShiftChangeSubmission, WorkflowError};
use super::SchedulingEngine;

/// Routes for every scheduling operation, mounted under `/api/v1`.
pub fn scheduling_router<S>(engine: Arc<SchedulingEngine<S>>) -> Router
where
    S: ResourceStore + 'static,
{
    Router::new()
        .route("/api/v1/shifts", get(list_shifts_handler::<S>))
        .route("/api/v1/shifts/:shift_id", get(get_shift_handler::<S>))
        .route(
            "/api/v1/shifts/:shift_id/roster",
            get(shift_roster_handler::<S>),
        )
        .route(
            "/api/v1/shifts/:shift_id/candidates",
            get(shift_candidates_handler::<S>),
        )
        .route(
            "/api/v1/shifts/:shift_id/allocations",
            post(allocate_handler::<S>),
        )
        .route(
            "/api/v1/shifts/:shift_id/allocations/:student_id",
            axum::routing::delete(deallocate_handler::<S>),
        )
        .route("/api/v1/students", get(list_students_handler::<S>))
        .route(
            "/api/v1/students/:student_id/schedule",
            get(student_schedule_handler::<S>),
        )
        .route(
            "/api/v1/students/:student_id/enrollments",
            get(enrollments_handler::<S>),
        )
        .route(
            "/api/v1/students/:student_id/conflicts",
            get(student_conflicts_handler::<S>),
        )
        .route(
            "/api/v1/students/:student_id/conflicts/diff",
            post(conflict_diff_handler::<S>),
        )
        .route("/api/v1/classrooms", get(classrooms_handler::<S>))
        .route(
            "/api/v1/classrooms/:classroom_id/availability",
            get(availability_handler::<S>),
        )
        .route("/api/v1/degrees", get(degrees_handler::<S>))
        .route("/api/v1/requests", get(request_overview_handler::<S>))
        .route(
            "/api/v1/requests/pending-effects",
            get(pending_effects_handler::<S>),
        )
        .route(
            "/api/v1/requests/shift",
            post(submit_shift_request_handler::<S>),
        )
        .route(
            "/api/v1/requests/shift/:request_id/decision",
            post(decide_shift_request_handler::<S>),
        )
        .route(
            "/api/v1/requests/shift/:request_id/retry-effect",
            post(retry_shift_effect_handler::<S>),
        )
        .route(
            "/api/v1/requests/classroom",
            post(submit_classroom_request_handler::<S>),
        )
        .route(
            "/api/v1/requests/classroom/:request_id/decision",
            post(decide_classroom_request_handler::<S>),
        )
        .route(
            "/api/v1/requests/classroom/:request_id/retry-effect",
            post(retry_classroom_effect_handler::<S>),
        )
        .route("/api/v1/notifications", get(notifications_handler::<S>))
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(mark_read_handler::<S>),
        )
        .route(
            "/api/v1/schedules/publish",
            post(publish_schedules_handler::<S>),
        )
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllocatePayload {
    student_id: StudentId,
}

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    day: String,
    from: u8,
    to: u8,
}

#[derive(Debug, Deserialize)]
struct DecisionPayload {
    decision: Decision,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityQuery {
    role: Role,
    #[serde(default)]
    user_id: Option<String>,
}

fn identity_from(query: &IdentityQuery) -> Result<Identity, Response> {
    let identity = match query.role {
        Role::Director => Identity::Director,
        Role::Student => match &query.user_id {
            Some(id) => Identity::Student(StudentId(id.clone())),
            None => return Err(validation_error("userId is required for role student")),
        },
        Role::Teacher => match &query.user_id {
            Some(id) => Identity::Teacher(TeacherId(id.clone())),
            None => return Err(validation_error("userId is required for role teacher")),
        },
    };
    Ok(identity)
}

fn validation_error(message: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": message })),
    )
        .into_response()
}

fn store_error_response(error: &StoreError) -> Response {
    let status = match error {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::Decode { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        StoreError::Transport(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

fn workflow_error_response(error: WorkflowError) -> Response {
    match error {
        WorkflowError::AlreadyDecided(_) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
        WorkflowError::NoPendingEffect(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
        WorkflowError::Store(ref store_error) => store_error_response(store_error),
    }
}

async fn list_shifts_handler<S>(State(engine): State<Arc<SchedulingEngine<S>>>) -> Response
where
    S: ResourceStore + 'static,
{
    match engine.catalog.enriched_shifts().await {
        Ok(shifts) => (StatusCode::OK, Json(shifts)).into_response(),
        Err(error) => store_error_response(&error),
    }
}

async fn get_shift_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(shift_id): Path<String>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine.catalog.enriched_shift(&ShiftId(shift_id)).await {
        Ok(shift) => (StatusCode::OK, Json(shift)).into_response(),
        Err(error) => store_error_response(&error),
    }
}

async fn shift_roster_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(shift_id): Path<String>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine.directory.shift_roster(&ShiftId(shift_id)).await {
        Ok(roster) => (StatusCode::OK, Json(roster)).into_response(),
        Err(error) => store_error_response(&error),
    }
}

async fn shift_candidates_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(shift_id): Path<String>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine.directory.shift_candidates(&ShiftId(shift_id)).await {
        Ok(candidates) => (StatusCode::OK, Json(candidates)).into_response(),
        Err(error) => store_error_response(&error),
    }
}

async fn allocate_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(shift_id): Path<String>,
    Json(payload): Json<AllocatePayload>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine
        .allocator
        .allocate(&payload.student_id, &ShiftId(shift_id))
        .await
    {
        Ok(allocation) => (StatusCode::CREATED, Json(allocation)).into_response(),
        Err(error @ AllocationError::CapacityExceeded { .. }) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
        Err(AllocationError::Store(error)) => store_error_response(&error),
    }
}

async fn deallocate_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path((shift_id, student_id)): Path<(String, String)>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine
        .allocator
        .remove(&ShiftId(shift_id), &StudentId(student_id), None)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({ "outcome": outcome.label() })),
        )
            .into_response(),
        Err(AllocationError::Store(error)) => store_error_response(&error),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
    }
}

async fn list_students_handler<S>(State(engine): State<Arc<SchedulingEngine<S>>>) -> Response
where
    S: ResourceStore + 'static,
{
    match engine.catalog.students().await {
        Ok(students) => (StatusCode::OK, Json(students)).into_response(),
        Err(error) => store_error_response(&error),
    }
}

async fn student_schedule_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(student_id): Path<String>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine
        .directory
        .student_schedule(&StudentId(student_id))
        .await
    {
        Ok(schedule) => (StatusCode::OK, Json(schedule)).into_response(),
        Err(error) => store_error_response(&error),
    }
}

async fn enrollments_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(student_id): Path<String>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine.directory.enrollments(&StudentId(student_id)).await {
        Ok(enrollments) => (StatusCode::OK, Json(enrollments)).into_response(),
        Err(error) => store_error_response(&error),
    }
}

async fn student_conflicts_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(student_id): Path<String>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine
        .catalog
        .conflicts_for_student(&StudentId(student_id))
        .await
    {
        Ok(conflicts) => (StatusCode::OK, Json(conflicts)).into_response(),
        Err(error) => store_error_response(&error),
    }
}

async fn conflict_diff_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(student_id): Path<String>,
    Json(prior): Json<Vec<Conflict>>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine
        .conflicts
        .diff_conflicts(&StudentId(student_id), &prior)
        .await
    {
        Ok(diff) => (
            StatusCode::OK,
            Json(json!({
                "resolved": diff.resolved,
                "created": diff.created,
                "hasChanges": diff.has_changes(),
            })),
        )
            .into_response(),
        Err(error) => store_error_response(&error),
    }
}

async fn classrooms_handler<S>(State(engine): State<Arc<SchedulingEngine<S>>>) -> Response
where
    S: ResourceStore + 'static,
{
    match engine.directory.classroom_occupancy().await {
        Ok(classrooms) => (StatusCode::OK, Json(classrooms)).into_response(),
        Err(error) => store_error_response(&error),
    }
}

async fn availability_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(classroom_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Response
where
    S: ResourceStore + 'static,
{
    let check = engine
        .conflicts
        .check_room(
            &ClassroomId(classroom_id),
            &query.day,
            query.from,
            query.to,
        )
        .await;
    (
        StatusCode::OK,
        Json(json!({ "available": check.is_available(), "result": check })),
    )
        .into_response()
}

async fn degrees_handler<S>(State(engine): State<Arc<SchedulingEngine<S>>>) -> Response
where
    S: ResourceStore + 'static,
{
    match engine.catalog.degrees().await {
        Ok(degrees) => (StatusCode::OK, Json(degrees)).into_response(),
        Err(error) => store_error_response(&error),
    }
}

async fn request_overview_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Query(query): Query<IdentityQuery>,
) -> Response
where
    S: ResourceStore + 'static,
{
    let identity = match identity_from(&query) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    match engine.requests.overview(&identity).await {
        Ok(summaries) => (StatusCode::OK, Json(summaries)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

async fn pending_effects_handler<S>(State(engine): State<Arc<SchedulingEngine<S>>>) -> Response
where
    S: ResourceStore + 'static,
{
    match engine.requests.pending_effects().await {
        Ok(pending) => (StatusCode::OK, Json(pending)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

async fn submit_shift_request_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Json(submission): Json<ShiftChangeSubmission>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine.requests.submit_shift_change(submission).await {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

async fn submit_classroom_request_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Json(submission): Json<ClassroomChangeSubmission>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine.requests.submit_classroom_change(submission).await {
        Ok(request) => (StatusCode::CREATED, Json(request)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

async fn decide_shift_request_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(request_id): Path<String>,
    Json(payload): Json<DecisionPayload>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine
        .requests
        .decide_shift_request(&RequestId(request_id), payload.decision)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

async fn decide_classroom_request_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(request_id): Path<String>,
    Json(payload): Json<DecisionPayload>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine
        .requests
        .decide_classroom_request(&RequestId(request_id), payload.decision)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

async fn retry_shift_effect_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine
        .requests
        .retry_shift_effect(&RequestId(request_id))
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

async fn retry_classroom_effect_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: ResourceStore + 'static,
{
    match engine
        .requests
        .retry_classroom_effect(&RequestId(request_id))
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

async fn notifications_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Query(query): Query<IdentityQuery>,
) -> Response
where
    S: ResourceStore + 'static,
{
    let identity = match identity_from(&query) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    match engine.notifications.feed(&identity).await {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(NotificationError::Store(error)) => store_error_response(&error),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
    }
}

async fn mark_read_handler<S>(
    State(engine): State<Arc<SchedulingEngine<S>>>,
    Path(notification_id): Path<String>,
    Json(query): Json<IdentityQuery>,
) -> Response
where
    S: ResourceStore + 'static,
{
    let identity = match identity_from(&query) {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    match engine.notifications.mark_read(&identity, &notification_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error @ NotificationError::Unrecognized { .. }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
        Err(NotificationError::Store(error)) => store_error_response(&error),
    }
}

async fn publish_schedules_handler<S>(State(engine): State<Arc<SchedulingEngine<S>>>) -> Response
where
    S: ResourceStore + 'static,
{
    match engine.notifications.publish_schedules().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(NotificationError::Store(error)) => store_error_response(&error),
        Err(error) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": error.to_string() })),
        )
            .into_response(),
    }
}
