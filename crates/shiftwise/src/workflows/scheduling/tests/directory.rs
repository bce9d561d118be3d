use serde_json::json;

use crate::store::{Collection, ResourceStore, StoreError};
use crate::workflows::scheduling::{ShiftId, StudentId};

use super::common::{faulty_engine, seeded_engine};

fn student(id: &str) -> StudentId {
    StudentId(id.to_string())
}

fn shift(id: &str) -> ShiftId {
    ShiftId(id.to_string())
}

#[tokio::test]
async fn schedule_lists_allocated_shifts_with_room_labels() {
    let (_store, engine) = seeded_engine().await;
    engine
        .allocator
        .allocate(&student("s1"), &shift("sh1"))
        .await
        .expect("lab allocation");
    engine
        .allocator
        .allocate(&student("s1"), &shift("sh3"))
        .await
        .expect("tp allocation");

    let schedule = engine
        .directory
        .student_schedule(&student("s1"))
        .await
        .expect("schedule succeeds");

    assert_eq!(schedule.len(), 2);
    let lab = schedule
        .iter()
        .find(|entry| entry.shift_id.0 == "sh1")
        .expect("lab entry present");
    assert_eq!(lab.course_name, "Operating Systems");
    assert_eq!(lab.course_abbreviation, "OS");
    assert_eq!(lab.kind, "lab");
    assert_eq!(lab.room, "Lab 0.04");

    let tp = schedule
        .iter()
        .find(|entry| entry.shift_id.0 == "sh3")
        .expect("tp entry present");
    assert_eq!(tp.course_name, "Compilers");
    // sh3 carries neither a type nor a room.
    assert_eq!(tp.kind, "Theoretical-Practical");
    assert_eq!(tp.room, "Unassigned");
}

#[tokio::test]
async fn schedule_skips_allocations_pointing_at_unreadable_shifts() {
    let (store, engine) = seeded_engine().await;
    engine
        .allocator
        .allocate(&student("s1"), &shift("sh1"))
        .await
        .expect("allocation succeeds");
    store
        .create(
            Collection::Allocations,
            json!({"id": "77", "studentId": "s1", "shiftId": "sh9"}),
        )
        .await
        .expect("dangling allocation seeded");

    let schedule = engine
        .directory
        .student_schedule(&student("s1"))
        .await
        .expect("schedule still succeeds");

    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].shift_id.0, "sh1");
}

#[tokio::test]
async fn missing_room_record_degrades_to_an_id_label() {
    let (store, engine) = seeded_engine().await;
    store
        .create(
            Collection::Shifts,
            json!({
                "id": "sh6",
                "courseId": "c2",
                "name": "TP9",
                "day": "Friday",
                "from": 8,
                "to": 10,
                "classroomId": "r9",
                "capacity": 10,
                "totalStudentsRegistered": 0,
            }),
        )
        .await
        .expect("shift seeded");
    engine
        .allocator
        .allocate(&student("s1"), &shift("sh6"))
        .await
        .expect("allocation succeeds");

    let schedule = engine
        .directory
        .student_schedule(&student("s1"))
        .await
        .expect("schedule succeeds");

    assert_eq!(schedule.len(), 1);
    assert_eq!(schedule[0].room, "Room r9");
}

#[tokio::test]
async fn enrollments_flag_courses_caught_in_a_conflict() {
    let (store, engine) = seeded_engine().await;
    store
        .create(
            Collection::Conflicts,
            json!({
                "id": "k1",
                "studentId": "s1",
                "courseIDs": ["c2"],
                "timestamp": "2026-03-01T09:00:00Z",
            }),
        )
        .await
        .expect("conflict seeded");

    let enrollments = engine
        .directory
        .enrollments(&student("s1"))
        .await
        .expect("enrollments succeed");

    assert_eq!(enrollments.len(), 2);
    assert_eq!(enrollments[0].course_id.0, "c1");
    assert_eq!(enrollments[0].name, "Operating Systems");
    assert_eq!(enrollments[0].abbreviation, "OS");
    assert!(!enrollments[0].has_conflict);
    assert_eq!(enrollments[1].course_id.0, "c2");
    assert!(enrollments[1].has_conflict);
}

#[tokio::test]
async fn unknown_enrolled_course_degrades_to_a_placeholder() {
    let (store, engine) = seeded_engine().await;
    store
        .create(
            Collection::Students,
            json!({
                "id": "s9",
                "name": "Vera Pinto",
                "email": "vera@example.edu",
                "enrolled": ["c9"],
                "specialStatus": false,
            }),
        )
        .await
        .expect("student seeded");

    let enrollments = engine
        .directory
        .enrollments(&student("s9"))
        .await
        .expect("enrollments succeed");

    assert_eq!(enrollments.len(), 1);
    assert_eq!(enrollments[0].name, "Course c9");
    assert_eq!(enrollments[0].abbreviation, "N/A");
}

#[tokio::test]
async fn conflict_lookup_failure_omits_flags_instead_of_erroring() {
    let (store, engine) = faulty_engine().await;
    store.break_op(Collection::Conflicts, "list");

    let enrollments = engine
        .directory
        .enrollments(&student("s1"))
        .await
        .expect("enrollments still succeed");

    assert_eq!(enrollments.len(), 2);
    assert!(enrollments.iter().all(|entry| !entry.has_conflict));
}

#[tokio::test]
async fn roster_lists_allocated_students_in_order() {
    let (_store, engine) = seeded_engine().await;
    engine
        .allocator
        .allocate(&student("s1"), &shift("sh1"))
        .await
        .expect("first allocation");
    engine
        .allocator
        .allocate(&student("s3"), &shift("sh1"))
        .await
        .expect("second allocation");

    let roster = engine
        .directory
        .shift_roster(&shift("sh1"))
        .await
        .expect("roster succeeds");

    let names: Vec<&str> = roster.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(names, vec!["Marta Reis", "Ines Faria"]);
    assert!(roster.iter().all(|entry| !entry.special_status));
}

#[tokio::test]
async fn roster_of_an_unknown_shift_is_not_found() {
    let (_store, engine) = seeded_engine().await;

    let missing = engine.directory.shift_roster(&shift("sh9")).await;
    assert!(matches!(missing, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn candidates_exclude_allocated_students_and_surface_current_assignments() {
    let (_store, engine) = seeded_engine().await;
    engine
        .allocator
        .allocate(&student("s1"), &shift("sh1"))
        .await
        .expect("allocation succeeds");

    // Everyone enrolled in the course is a candidate for the other lab.
    let candidates = engine
        .directory
        .shift_candidates(&shift("sh2"))
        .await
        .expect("candidates succeed");
    assert_eq!(candidates.len(), 4);
    let marta = candidates
        .iter()
        .find(|entry| entry.student_id.0 == "s1")
        .expect("allocated student still a candidate elsewhere");
    assert_eq!(marta.current_shift_id, Some(shift("sh1")));
    assert_eq!(marta.current_shift_name.as_deref(), Some("PL1"));
    let rui = candidates
        .iter()
        .find(|entry| entry.student_id.0 == "s2")
        .expect("candidate present");
    assert!(rui.special_status);
    assert_eq!(rui.current_shift_id, None);

    // The shift they already sit on no longer lists them.
    let candidates = engine
        .directory
        .shift_candidates(&shift("sh1"))
        .await
        .expect("candidates succeed");
    let ids: Vec<&str> = candidates
        .iter()
        .map(|entry| entry.student_id.0.as_str())
        .collect();
    assert_eq!(ids, vec!["s2", "s3", "s4"]);
}

#[tokio::test]
async fn theory_shift_candidates_ignore_lab_assignments() {
    let (_store, engine) = seeded_engine().await;
    engine
        .allocator
        .allocate(&student("s1"), &shift("sh1"))
        .await
        .expect("allocation succeeds");

    let candidates = engine
        .directory
        .shift_candidates(&shift("sh4"))
        .await
        .expect("candidates succeed");
    let marta = candidates
        .iter()
        .find(|entry| entry.student_id.0 == "s1")
        .expect("candidate present");
    // The lab seat is a different shift type, so it is not "current" here.
    assert_eq!(marta.current_shift_id, None);
}

#[tokio::test]
async fn occupancy_marks_rooms_hosting_shifts() {
    let (_store, engine) = seeded_engine().await;

    let rooms = engine
        .directory
        .classroom_occupancy()
        .await
        .expect("occupancy succeeds");

    assert_eq!(rooms.len(), 3);
    assert_eq!(rooms[0].classroom_id.0, "r1");
    assert_eq!(rooms[0].name, "Lab 0.04");
    assert_eq!(rooms[0].building, "EB");
    assert!(rooms[0].occupied);
    assert!(rooms[1].occupied);
    assert!(!rooms[2].occupied);
}

#[tokio::test]
async fn occupancy_survives_missing_building_and_shift_listings() {
    let (store, engine) = faulty_engine().await;
    store.break_op(Collection::Buildings, "list");
    store.break_op(Collection::Shifts, "list");

    let rooms = engine
        .directory
        .classroom_occupancy()
        .await
        .expect("occupancy still succeeds");

    assert_eq!(rooms.len(), 3);
    assert!(rooms.iter().all(|room| room.building == "N/A"));
    assert!(rooms.iter().all(|room| !room.occupied));
}
