use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::store::Collection;
use crate::workflows::scheduling::conflicts::overlaps;
use crate::workflows::scheduling::{
    Catalog, ClassroomId, Conflict, ConflictDetector, ConflictDiffPolicy, CourseId, RequestId,
    RoomCheck, StudentId,
};

use super::common::{faulty_engine, seeded_engine};

fn room(id: &str) -> ClassroomId {
    ClassroomId(id.to_string())
}

fn conflict(id: &str, student: &str, courses: &[&str]) -> Conflict {
    Conflict {
        id: id.to_string(),
        student_id: StudentId(student.to_string()),
        course_ids: courses
            .iter()
            .map(|course| CourseId((*course).to_string()))
            .collect(),
        timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    }
}

fn conflict_json(id: &str, student: &str, courses: &[&str]) -> serde_json::Value {
    json!({
        "id": id,
        "studentId": student,
        "courseIDs": courses,
        "timestamp": "2026-03-01T09:00:00Z",
    })
}

#[test]
fn overlap_is_half_open() {
    assert!(overlaps(9, 11, 8, 10));
    assert!(overlaps(8, 10, 9, 11));
    assert!(overlaps(8, 12, 9, 10));
    assert!(!overlaps(10, 12, 8, 10));
    assert!(!overlaps(8, 10, 10, 12));
    assert!(!overlaps(8, 9, 11, 12));
}

#[tokio::test]
async fn occupied_window_reports_the_clashing_shift() {
    let (_store, engine) = seeded_engine().await;

    // sh1 sits in r1 on Monday 8-10.
    let check = engine.conflicts.check_room(&room("r1"), "Monday", 9, 11).await;
    match check {
        RoomCheck::Occupied { clash } => {
            assert_eq!(clash.shift_id.0, "sh1");
            assert_eq!(clash.course_name, "Operating Systems");
            assert_eq!(clash.from, 8);
            assert_eq!(clash.to, 10);
        }
        other => panic!("expected an occupied room, got {other:?}"),
    }
}

#[tokio::test]
async fn shared_boundary_hour_is_free() {
    let (_store, engine) = seeded_engine().await;

    let check = engine
        .conflicts
        .check_room(&room("r1"), "Monday", 10, 12)
        .await;
    assert!(check.is_available());
}

#[tokio::test]
async fn other_days_do_not_clash() {
    let (_store, engine) = seeded_engine().await;

    let check = engine
        .conflicts
        .check_room(&room("r1"), "Tuesday", 8, 10)
        .await;
    assert!(check.is_available());
}

#[tokio::test]
async fn pending_classroom_request_blocks_the_whole_room() {
    let (store, engine) = seeded_engine().await;
    store
        .seed(
            Collection::ClassroomRequests,
            vec![json!({
                "id": "10",
                "teacherId": "t1",
                "classroomId": "r3",
                "shiftId": "sh1",
                "response": null,
                "responseSeenByTeacher": false,
                "date": "2026-03-01T10:00:00Z",
            })],
        )
        .await;

    // r3 hosts no shift at all; the undecided request alone blocks it.
    let check = engine.conflicts.check_room(&room("r3"), "Friday", 8, 9).await;
    match check {
        RoomCheck::AwaitingDecision { request_id } => {
            assert_eq!(request_id, RequestId("10".to_string()));
        }
        other => panic!("expected an awaiting-decision room, got {other:?}"),
    }
}

#[tokio::test]
async fn decided_classroom_request_does_not_block() {
    let (store, engine) = seeded_engine().await;
    store
        .seed(
            Collection::ClassroomRequests,
            vec![json!({
                "id": "10",
                "teacherId": "t1",
                "classroomId": "r3",
                "shiftId": "sh1",
                "response": "rejected",
                "responseSeenByTeacher": false,
                "date": "2026-03-01T10:00:00Z",
            })],
        )
        .await;

    let check = engine.conflicts.check_room(&room("r3"), "Friday", 8, 9).await;
    assert!(check.is_available());
}

#[tokio::test]
async fn lookup_failure_reads_as_indeterminate_not_error() {
    let (store, engine) = faulty_engine().await;
    store.break_op(Collection::Shifts, "list");

    let check = engine.conflicts.check_room(&room("r1"), "Monday", 9, 11).await;
    assert!(matches!(check, RoomCheck::Indeterminate { .. }));
    assert!(!check.is_available());
}

#[tokio::test]
async fn diff_separates_resolved_from_created() {
    let (store, engine) = seeded_engine().await;
    store
        .seed(
            Collection::Conflicts,
            vec![
                conflict_json("k2", "s1", &["c1", "c2"]),
                conflict_json("k3", "s1", &["c2"]),
            ],
        )
        .await;

    let prior = vec![
        conflict("k1", "s1", &["c1"]),
        conflict("k2", "s1", &["c1", "c2"]),
    ];
    let diff = engine
        .conflicts
        .diff_conflicts(&StudentId("s1".to_string()), &prior)
        .await
        .expect("diff succeeds");

    assert!(diff.has_changes());
    assert_eq!(diff.resolved.len(), 1);
    assert_eq!(diff.resolved[0].conflict.id, "k1");
    assert_eq!(diff.created.len(), 1);
    assert_eq!(diff.created[0].conflict.id, "k3");
}

#[tokio::test]
async fn identical_sets_report_no_changes() {
    let (store, engine) = seeded_engine().await;
    store
        .seed(
            Collection::Conflicts,
            vec![conflict_json("k1", "s1", &["c1", "c2"])],
        )
        .await;

    let prior = vec![conflict("k1", "s1", &["c1", "c2"])];
    let diff = engine
        .conflicts
        .diff_conflicts(&StudentId("s1".to_string()), &prior)
        .await
        .expect("diff succeeds");
    assert!(!diff.has_changes());
}

#[tokio::test]
async fn identity_policy_counts_rematerialized_conflicts_twice() {
    let (store, engine) = seeded_engine().await;
    // Same content as the prior snapshot but re-created under a new id.
    store
        .seed(
            Collection::Conflicts,
            vec![conflict_json("k9", "s1", &["c1", "c2"])],
        )
        .await;

    let prior = vec![conflict("k1", "s1", &["c1", "c2"])];
    let diff = engine
        .conflicts
        .diff_conflicts(&StudentId("s1".to_string()), &prior)
        .await
        .expect("diff succeeds");

    assert_eq!(diff.resolved.len(), 1);
    assert_eq!(diff.created.len(), 1);
}

#[tokio::test]
async fn signature_policy_cancels_rematerialized_conflicts() {
    let (store, _engine) = seeded_engine().await;
    store
        .seed(
            Collection::Conflicts,
            vec![conflict_json("k9", "s1", &["c2", "c1"])],
        )
        .await;

    let detector = ConflictDetector::new(
        Catalog::new(std::sync::Arc::clone(&store)),
        ConflictDiffPolicy::Signature,
    );
    // Course order differs on purpose; signatures sort before comparing.
    let prior = vec![conflict("k1", "s1", &["c1", "c2"])];
    let diff = detector
        .diff_conflicts(&StudentId("s1".to_string()), &prior)
        .await
        .expect("diff succeeds");
    assert!(!diff.has_changes());
}

#[tokio::test]
async fn unknown_courses_degrade_to_placeholder_names() {
    let (store, engine) = seeded_engine().await;
    store
        .seed(
            Collection::Conflicts,
            vec![conflict_json("k1", "s1", &["c1", "c9"])],
        )
        .await;

    let diff = engine
        .conflicts
        .diff_conflicts(&StudentId("s1".to_string()), &[])
        .await
        .expect("diff succeeds");

    assert_eq!(diff.created.len(), 1);
    assert_eq!(
        diff.created[0].course_names,
        vec!["Operating Systems".to_string(), "Course c9".to_string()]
    );
}

#[test]
fn diff_policy_parses_from_config_strings() {
    assert_eq!(
        "identity".parse::<ConflictDiffPolicy>().unwrap(),
        ConflictDiffPolicy::Identity
    );
    assert_eq!(
        "Signature".parse::<ConflictDiffPolicy>().unwrap(),
        ConflictDiffPolicy::Signature
    );
    assert!("fuzzy".parse::<ConflictDiffPolicy>().is_err());
}
