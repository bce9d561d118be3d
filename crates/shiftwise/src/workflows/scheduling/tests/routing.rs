use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use crate::store::{Collection, InMemoryStore, ResourceStore};
use crate::workflows::scheduling::{scheduling_router, ShiftId, StudentId};

use super::common::{read_json_body, seeded_engine};

async fn seeded_router() -> (Arc<InMemoryStore>, Router) {
    let (store, engine) = seeded_engine().await;
    (store, scheduling_router(Arc::new(engine)))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request built")
}

fn post(uri: &str, payload: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request built")
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .expect("request built")
}

#[tokio::test]
async fn allocation_round_trip_over_http() {
    let (_store, router) = seeded_router().await;

    let response = router
        .clone()
        .oneshot(post(
            "/api/v1/shifts/sh1/allocations",
            json!({"studentId": "s1"}),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["id"], json!("1"));
    assert_eq!(body["studentId"], json!("s1"));
    assert_eq!(body["shiftId"], json!("sh1"));

    let response = router
        .clone()
        .oneshot(get("/api/v1/shifts/sh1"))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["courseName"], json!("Operating Systems"));
    assert_eq!(body["current"], json!(1));
    assert_eq!(body["isFull"], json!(false));
    assert_eq!(body["status"], json!("available"));

    let response = router
        .clone()
        .oneshot(delete("/api/v1/shifts/sh1/allocations/s1"))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["outcome"], json!("removed"));

    let response = router
        .clone()
        .oneshot(delete("/api/v1/shifts/sh1/allocations/s1"))
        .await
        .expect("request handled");
    let body = read_json_body(response).await;
    assert_eq!(body["outcome"], json!("already_absent"));
}

#[tokio::test]
async fn capacity_violation_maps_to_conflict() {
    let (_store, engine) = seeded_engine().await;
    engine
        .allocator
        .allocate(&StudentId("s3".to_string()), &ShiftId("sh1".to_string()))
        .await
        .expect("first seat");
    engine
        .allocator
        .allocate(&StudentId("s4".to_string()), &ShiftId("sh1".to_string()))
        .await
        .expect("second seat");
    let router = scheduling_router(Arc::new(engine));

    let response = router
        .oneshot(post(
            "/api/v1/shifts/sh1/allocations",
            json!({"studentId": "s1"}),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error string")
        .contains("capacity"));
}

#[tokio::test]
async fn unknown_ids_map_to_not_found() {
    let (_store, router) = seeded_router().await;

    let response = router
        .clone()
        .oneshot(post(
            "/api/v1/shifts/sh9/allocations",
            json!({"studentId": "s1"}),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .clone()
        .oneshot(get("/api/v1/shifts/sh9"))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .clone()
        .oneshot(get("/api/v1/shifts/sh9/roster"))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn availability_query_honors_the_shared_boundary() {
    let (_store, router) = seeded_router().await;

    let response = router
        .clone()
        .oneshot(get(
            "/api/v1/classrooms/r1/availability?day=Monday&from=10&to=12",
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["available"], json!(true));

    let response = router
        .clone()
        .oneshot(get(
            "/api/v1/classrooms/r1/availability?day=Monday&from=9&to=11",
        ))
        .await
        .expect("request handled");
    let body = read_json_body(response).await;
    assert_eq!(body["available"], json!(false));
    assert_eq!(body["result"]["status"], json!("occupied"));
    assert_eq!(body["result"]["clash"]["shiftId"], json!("sh1"));
}

#[tokio::test]
async fn listing_routes_serve_enriched_and_reference_data() {
    let (_store, router) = seeded_router().await;

    let response = router
        .clone()
        .oneshot(get("/api/v1/shifts"))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let shifts = body.as_array().expect("shift array");
    assert_eq!(shifts.len(), 4);
    assert!(shifts.iter().all(|shift| shift.get("courseName").is_some()));

    let response = router
        .clone()
        .oneshot(get("/api/v1/degrees"))
        .await
        .expect("request handled");
    let body = read_json_body(response).await;
    assert_eq!(body.as_array().expect("degree array").len(), 1);

    let response = router
        .clone()
        .oneshot(get("/api/v1/classrooms"))
        .await
        .expect("request handled");
    let body = read_json_body(response).await;
    let rooms = body.as_array().expect("classroom array");
    assert_eq!(rooms.len(), 3);
    assert!(rooms.iter().all(|room| room["building"] == json!("EB")));
}

#[tokio::test]
async fn identity_scoped_routes_validate_the_caller() {
    let (_store, router) = seeded_router().await;

    let response = router
        .clone()
        .oneshot(get("/api/v1/requests?role=student"))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], json!("userId is required for role student"));

    let response = router
        .clone()
        .oneshot(get("/api/v1/requests?role=director"))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert!(body.as_array().expect("summary array").is_empty());

    let response = router
        .clone()
        .oneshot(get("/api/v1/notifications?role=teacher"))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn decision_route_applies_and_then_conflicts() {
    let (_store, router) = seeded_router().await;

    let response = router
        .clone()
        .oneshot(post(
            "/api/v1/requests/shift",
            json!({"studentId": "s1", "shiftId": "sh1", "alternativeShiftId": "sh2"}),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["id"], json!("1"));
    assert_eq!(body["response"], json!(null));

    let response = router
        .clone()
        .oneshot(post(
            "/api/v1/requests/shift/1/decision",
            json!({"decision": "approved"}),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["request"]["response"], json!("ok"));
    assert_eq!(body["effect"]["state"], json!("applied"));

    let response = router
        .clone()
        .oneshot(post(
            "/api/v1/requests/shift/1/decision",
            json!({"decision": "rejected"}),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn mark_read_rejects_a_foreign_feed_entry() {
    let (_store, router) = seeded_router().await;

    let response = router
        .oneshot(post(
            "/api/v1/notifications/mail_9/read",
            json!({"role": "student", "userId": "s1"}),
        ))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn conflict_diff_route_reports_changes() {
    let (store, router) = seeded_router().await;
    store
        .create(
            Collection::Conflicts,
            json!({
                "id": "k1",
                "studentId": "s1",
                "courseIDs": ["c1", "c2"],
                "timestamp": "2026-03-01T09:00:00Z",
            }),
        )
        .await
        .expect("conflict seeded");

    let response = router
        .oneshot(post("/api/v1/students/s1/conflicts/diff", json!([])))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["hasChanges"], json!(true));
    assert_eq!(body["created"][0]["id"], json!("k1"));
    assert_eq!(
        body["created"][0]["courseNames"],
        json!(["Operating Systems", "Compilers"])
    );
    assert!(body["resolved"].as_array().expect("resolved array").is_empty());
}

#[tokio::test]
async fn publish_route_reports_the_fanout() {
    let (store, router) = seeded_router().await;

    let response = router
        .oneshot(post("/api/v1/schedules/publish", json!({})))
        .await
        .expect("request handled");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["notified"], json!(4));
    assert_eq!(body["failed"], json!(0));

    let notices = store
        .list(Collection::Notifications, &[])
        .await
        .expect("notices listed");
    assert_eq!(notices.len(), 4);
}
