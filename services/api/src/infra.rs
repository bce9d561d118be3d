use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use shiftwise::store::{Collection, InMemoryStore};
use shiftwise::workflows::scheduling::ConflictDiffPolicy;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_diff_policy(raw: &str) -> Result<ConflictDiffPolicy, String> {
    raw.parse()
}

/// In-memory dataset the service boots with: a small campus with courses,
/// shifts, a handful of students, live allocations, and one pending change
/// request. Registration counters match the seeded allocations.
pub(crate) async fn seeded_store() -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();

    store
        .seed(
            Collection::Degrees,
            vec![json!({"id": "d1", "name": "Software Engineering"})],
        )
        .await;
    store
        .seed(
            Collection::Courses,
            vec![
                json!({"id": "c1", "name": "Software Architecture", "abbreviation": "SA"}),
                json!({"id": "c2", "name": "Distributed Systems", "abbreviation": "DS"}),
                json!({"id": "c3", "name": "Human-Computer Interaction", "abbreviation": "HCI"}),
            ],
        )
        .await;
    store
        .seed(
            Collection::Buildings,
            vec![
                json!({"id": "b1", "name": "North Tower", "abbreviation": "NT"}),
                json!({"id": "b2", "name": "Annex", "abbreviation": "AX"}),
            ],
        )
        .await;
    store
        .seed(
            Collection::Classrooms,
            vec![
                json!({"id": "r1", "name": "Lab 1.01", "buildingId": "b1"}),
                json!({"id": "r2", "name": "Lab 1.02", "buildingId": "b1"}),
                json!({"id": "r3", "name": "Auditorium A", "buildingId": "b2"}),
                json!({"id": "r4", "name": "Studio 2", "buildingId": "b2"}),
            ],
        )
        .await;
    store
        .seed(
            Collection::Teachers,
            vec![
                json!({"id": "t1", "name": "Prof. Carvalho", "email": "carvalho@campus.edu"}),
                json!({"id": "t2", "name": "Prof. Moreira", "email": "moreira@campus.edu"}),
            ],
        )
        .await;
    store
        .seed(
            Collection::Students,
            vec![
                json!({"id": "a101", "name": "Joana Martins", "email": "a101@campus.edu", "enrolled": ["c1", "c2"], "specialStatus": false}),
                json!({"id": "a102", "name": "Pedro Antunes", "email": "a102@campus.edu", "enrolled": ["c1", "c2"], "specialStatus": true}),
                json!({"id": "a103", "name": "Sofia Neves", "email": "a103@campus.edu", "enrolled": ["c1", "c3"], "specialStatus": false}),
                json!({"id": "a104", "name": "Miguel Rocha", "email": "a104@campus.edu", "enrolled": ["c1"], "specialStatus": false}),
                json!({"id": "a105", "name": "Carolina Pires", "email": "a105@campus.edu", "enrolled": ["c2", "c3"], "specialStatus": false}),
                json!({"id": "a106", "name": "Andre Matos", "email": "a106@campus.edu", "enrolled": ["c1", "c3"], "specialStatus": false}),
            ],
        )
        .await;
    store
        .seed(
            Collection::Shifts,
            vec![
                json!({"id": "sa-t1", "courseId": "c1", "name": "T1", "type": "theory", "day": "Monday", "from": 9, "to": 11, "classroomId": "r3", "teacherId": "t1", "capacity": 60, "totalStudentsRegistered": 2}),
                json!({"id": "sa-pl1", "courseId": "c1", "name": "PL1", "type": "lab", "day": "Monday", "from": 11, "to": 13, "classroomId": "r1", "teacherId": "t1", "capacity": 3, "totalStudentsRegistered": 2}),
                json!({"id": "sa-pl2", "courseId": "c1", "name": "PL2", "type": "lab", "day": "Tuesday", "from": 9, "to": 11, "classroomId": "r2", "teacherId": "t1", "capacity": 3, "totalStudentsRegistered": 0}),
                json!({"id": "ds-t1", "courseId": "c2", "name": "T1", "type": "theory", "day": "Wednesday", "from": 10, "to": 12, "classroomId": "r3", "teacherId": "t2", "capacity": 60, "totalStudentsRegistered": 1}),
                json!({"id": "ds-pl1", "courseId": "c2", "name": "PL1", "type": "lab", "day": "Thursday", "from": 14, "to": 16, "classroomId": "r2", "teacherId": "t2", "capacity": 2, "totalStudentsRegistered": 1}),
                json!({"id": "hci-tp1", "courseId": "c3", "name": "TP1", "day": "Friday", "from": 9, "to": 11, "classroomId": "r4", "capacity": 25, "totalStudentsRegistered": 0}),
            ],
        )
        .await;
    store
        .seed(
            Collection::Allocations,
            vec![
                json!({"id": "1", "studentId": "a101", "shiftId": "sa-t1"}),
                json!({"id": "2", "studentId": "a103", "shiftId": "sa-t1"}),
                json!({"id": "3", "studentId": "a101", "shiftId": "sa-pl1"}),
                json!({"id": "4", "studentId": "a104", "shiftId": "sa-pl1"}),
                json!({"id": "5", "studentId": "a101", "shiftId": "ds-t1"}),
                json!({"id": "6", "studentId": "a105", "shiftId": "ds-pl1"}),
            ],
        )
        .await;
    store
        .seed(
            Collection::ShiftRequests,
            vec![json!({
                "id": "1",
                "studentId": "a104",
                "shiftId": "sa-pl1",
                "alternativeShiftId": "sa-pl2",
                "reason": "overlap with a part-time job",
                "response": null,
                "responseSeenByStudent": false,
                "date": "2026-02-10T09:30:00Z",
                "effectPending": false,
            })],
        )
        .await;
    store
        .seed(
            Collection::Conflicts,
            vec![json!({
                "id": "k1",
                "studentId": "a101",
                "courseIDs": ["c1", "c2"],
                "timestamp": "2026-02-10T08:00:00Z",
            })],
        )
        .await;

    Arc::new(store)
}
