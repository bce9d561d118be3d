use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::store::{Collection, Filter, InMemoryStore, ResourceStore, StoreError};
use crate::workflows::scheduling::{ConflictDiffPolicy, SchedulingEngine};

/// Base data set shared by most tests: two courses, three lab/theory shifts,
/// four students (one with special status), rooms and staff to hang labels
/// on. Shift `sh1` and `sh2` are lab siblings of course `c1`.
pub(super) async fn seed_base(store: &InMemoryStore) {
    store
        .seed(
            Collection::Students,
            vec![
                json!({"id": "s1", "name": "Marta Reis", "email": "marta@example.edu", "enrolled": ["c1", "c2"], "specialStatus": false}),
                json!({"id": "s2", "name": "Rui Lopes", "email": "rui@example.edu", "enrolled": ["c1"], "specialStatus": true}),
                json!({"id": "s3", "name": "Ines Faria", "email": "ines@example.edu", "enrolled": ["c1"], "specialStatus": false}),
                json!({"id": "s4", "name": "Tiago Nunes", "email": "tiago@example.edu", "enrolled": ["c1", "c2"], "specialStatus": false}),
            ],
        )
        .await;
    store
        .seed(
            Collection::Courses,
            vec![
                json!({"id": "c1", "name": "Operating Systems", "abbreviation": "OS"}),
                json!({"id": "c2", "name": "Compilers", "abbreviation": "CP"}),
            ],
        )
        .await;
    store
        .seed(
            Collection::Shifts,
            vec![
                json!({"id": "sh1", "courseId": "c1", "name": "PL1", "type": "lab", "day": "Monday", "from": 8, "to": 10, "classroomId": "r1", "teacherId": "t1", "capacity": 2, "totalStudentsRegistered": 0}),
                json!({"id": "sh2", "courseId": "c1", "name": "PL2", "type": "lab", "day": "Tuesday", "from": 10, "to": 12, "classroomId": "r2", "teacherId": "t1", "capacity": 2, "totalStudentsRegistered": 0}),
                json!({"id": "sh3", "courseId": "c2", "name": "TP1", "day": "Monday", "from": 10, "to": 12, "classroomId": null, "capacity": 30, "totalStudentsRegistered": 0}),
                json!({"id": "sh4", "courseId": "c1", "name": "T1", "type": "theory", "day": "Wednesday", "from": 9, "to": 11, "classroomId": null, "capacity": 40, "totalStudentsRegistered": 0}),
            ],
        )
        .await;
    store
        .seed(
            Collection::Classrooms,
            vec![
                json!({"id": "r1", "name": "Lab 0.04", "buildingId": "b1"}),
                json!({"id": "r2", "name": "Lab 0.08", "buildingId": "b1"}),
                json!({"id": "r3", "name": "Amphitheater 1", "buildingId": "b1"}),
            ],
        )
        .await;
    store
        .seed(
            Collection::Buildings,
            vec![json!({"id": "b1", "name": "Engineering Block", "abbreviation": "EB"})],
        )
        .await;
    store
        .seed(
            Collection::Teachers,
            vec![json!({"id": "t1", "name": "Prof. Dias", "email": "dias@example.edu"})],
        )
        .await;
    store
        .seed(
            Collection::Degrees,
            vec![json!({"id": "d1", "name": "Computer Science"})],
        )
        .await;
}

pub(super) async fn seeded_engine() -> (Arc<InMemoryStore>, SchedulingEngine<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    seed_base(&store).await;
    let engine = SchedulingEngine::new(Arc::clone(&store), ConflictDiffPolicy::Identity);
    (store, engine)
}

pub(super) async fn faulty_engine() -> (Arc<FaultStore>, SchedulingEngine<FaultStore>) {
    let inner = InMemoryStore::new();
    seed_base(&inner).await;
    let store = Arc::new(FaultStore::new(inner));
    let engine = SchedulingEngine::new(Arc::clone(&store), ConflictDiffPolicy::Identity);
    (store, engine)
}

/// Registration counter currently persisted on a shift.
pub(super) async fn registered_count<S: ResourceStore>(store: &S, shift_id: &str) -> u64 {
    let record = store
        .get(Collection::Shifts, shift_id)
        .await
        .expect("shift exists");
    record
        .get("totalStudentsRegistered")
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Live allocation records pointing at a shift.
pub(super) async fn allocations_on<S: ResourceStore>(store: &S, shift_id: &str) -> Vec<Value> {
    store
        .list(Collection::Allocations, &[Filter::eq("shiftId", shift_id)])
        .await
        .expect("allocations list")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("response body was readable");
    serde_json::from_slice(&bytes).expect("response body was json")
}

/// Store wrapper that fails selected operations, for exercising degraded
/// paths. Operation names are "list", "get", "create", "update", "delete".
pub(super) struct FaultStore {
    inner: InMemoryStore,
    broken: Mutex<HashSet<(Collection, &'static str)>>,
    broken_creates: Mutex<Vec<(Collection, String, Value)>>,
}

impl FaultStore {
    pub(super) fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            broken: Mutex::new(HashSet::new()),
            broken_creates: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn break_op(&self, collection: Collection, op: &'static str) {
        self.broken
            .lock()
            .expect("fault set poisoned")
            .insert((collection, op));
    }

    pub(super) fn heal(&self, collection: Collection, op: &'static str) {
        self.broken
            .lock()
            .expect("fault set poisoned")
            .remove(&(collection, op));
    }

    /// Fail only creates whose record has `field` equal to `value`.
    pub(super) fn break_create_matching(
        &self,
        collection: Collection,
        field: &str,
        value: Value,
    ) {
        self.broken_creates
            .lock()
            .expect("fault set poisoned")
            .push((collection, field.to_string(), value));
    }

    fn check(&self, collection: Collection, op: &'static str) -> Result<(), StoreError> {
        if self
            .broken
            .lock()
            .expect("fault set poisoned")
            .contains(&(collection, op))
        {
            return Err(StoreError::Transport(format!(
                "injected {op} failure on {collection}"
            )));
        }
        Ok(())
    }

    fn check_create(&self, collection: Collection, record: &Value) -> Result<(), StoreError> {
        let faults = self.broken_creates.lock().expect("fault set poisoned");
        for (broken_collection, field, value) in faults.iter() {
            if *broken_collection == collection && record.get(field) == Some(value) {
                return Err(StoreError::Transport(format!(
                    "injected create failure on {collection}"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceStore for FaultStore {
    async fn list(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Value>, StoreError> {
        self.check(collection, "list")?;
        self.inner.list(collection, filters).await
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Value, StoreError> {
        self.check(collection, "get")?;
        self.inner.get(collection, id).await
    }

    async fn create(&self, collection: Collection, record: Value) -> Result<Value, StoreError> {
        self.check(collection, "create")?;
        self.check_create(collection, &record)?;
        self.inner.create(collection, record).await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        record: Value,
    ) -> Result<Value, StoreError> {
        self.check(collection, "update")?;
        self.inner.update(collection, id, record).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        self.check(collection, "delete")?;
        self.inner.delete(collection, id).await
    }
}
