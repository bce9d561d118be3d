//! Typed access to the resource store shared by every scheduling service.
//!
//! The catalog decodes raw records into domain structs and owns id issuance
//! for created records. Services go through it exclusively; raw JSON never
//! leaves this module.

use std::sync::Arc;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::store::{Collection, Filter, ResourceStore, StoreError};

use super::domain::{
    Allocation, Building, Classroom, ClassroomId, ClassroomRequest, Conflict, Course, CourseId,
    Degree, RequestId, ScheduleNotice, Shift, ShiftId, ShiftRequest, Student, StudentId, Teacher,
    TeacherId, SCHEDULE_UPDATE_KIND,
};
use super::enrichment::{enrich, EnrichedShift};

pub struct Catalog<S> {
    store: Arc<S>,
    id_guard: Arc<Mutex<()>>,
}

impl<S> Clone for Catalog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            id_guard: Arc::clone(&self.id_guard),
        }
    }
}

impl<S: ResourceStore> Catalog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            id_guard: Arc::new(Mutex::new(())),
        }
    }

    fn decode<T: DeserializeOwned>(collection: Collection, record: Value) -> Result<T, StoreError> {
        serde_json::from_value(record).map_err(|source| StoreError::Decode { collection, source })
    }

    fn encode<T: Serialize>(collection: Collection, record: &T) -> Result<Value, StoreError> {
        serde_json::to_value(record).map_err(|source| StoreError::Decode { collection, source })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<T, StoreError> {
        let record = self.store.get(collection, id).await?;
        Self::decode(collection, record)
    }

    async fn fetch_all<T: DeserializeOwned>(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<T>, StoreError> {
        let records = self.store.list(collection, filters).await?;
        records
            .into_iter()
            .map(|record| Self::decode(collection, record))
            .collect()
    }

    /// Insert a typed record as-is. The id must already be set.
    pub async fn insert<T: Serialize>(
        &self,
        collection: Collection,
        record: &T,
    ) -> Result<(), StoreError> {
        let value = Self::encode(collection, record)?;
        self.store.create(collection, value).await?;
        Ok(())
    }

    /// Replace a record wholesale. Fails with `NotFound` when the id is gone.
    pub async fn replace<T: Serialize>(
        &self,
        collection: Collection,
        id: &str,
        record: &T,
    ) -> Result<(), StoreError> {
        let value = Self::encode(collection, record)?;
        self.store.update(collection, id, value).await?;
        Ok(())
    }

    /// Build and insert a record under a freshly issued id.
    ///
    /// Ids are numeric strings, one past the highest numeric id already in the
    /// collection. The guard spans the read and the insert, so concurrent
    /// creations are serialized and never share an id.
    pub async fn create_numbered<T, F>(
        &self,
        collection: Collection,
        build: F,
    ) -> Result<T, StoreError>
    where
        T: Serialize,
        F: FnOnce(String) -> T,
    {
        let _serial = self.id_guard.lock().await;
        let records = self.store.list(collection, &[]).await?;
        let highest = records.iter().filter_map(numeric_id).max().unwrap_or(0);
        let record = build((highest + 1).to_string());
        let value = Self::encode(collection, &record)?;
        self.store.create(collection, value).await?;
        Ok(record)
    }

    pub async fn student(&self, id: &StudentId) -> Result<Student, StoreError> {
        self.fetch(Collection::Students, &id.0).await
    }

    pub async fn students(&self) -> Result<Vec<Student>, StoreError> {
        self.fetch_all(Collection::Students, &[]).await
    }

    pub async fn course(&self, id: &CourseId) -> Result<Course, StoreError> {
        self.fetch(Collection::Courses, &id.0).await
    }

    pub async fn shift(&self, id: &ShiftId) -> Result<Shift, StoreError> {
        self.fetch(Collection::Shifts, &id.0).await
    }

    pub async fn shifts(&self) -> Result<Vec<Shift>, StoreError> {
        self.fetch_all(Collection::Shifts, &[]).await
    }

    pub async fn shifts_for_room_on_day(
        &self,
        room: &ClassroomId,
        day: &str,
    ) -> Result<Vec<Shift>, StoreError> {
        self.fetch_all(
            Collection::Shifts,
            &[
                Filter::eq("classroomId", room.0.as_str()),
                Filter::eq("day", day),
            ],
        )
        .await
    }

    pub async fn save_shift(&self, shift: &Shift) -> Result<(), StoreError> {
        self.replace(Collection::Shifts, &shift.id.0, shift).await
    }

    /// Shift with course labeling resolved. A failed course lookup degrades to
    /// the sentinel name instead of failing the read.
    pub async fn enriched_shift(&self, id: &ShiftId) -> Result<EnrichedShift, StoreError> {
        let shift = self.shift(id).await?;
        let course = self.course(&shift.course_id).await.ok();
        Ok(enrich(&shift, course.as_ref()))
    }

    pub async fn enriched_shifts(&self) -> Result<Vec<EnrichedShift>, StoreError> {
        let shifts = self.shifts().await?;
        let lookups = shifts.iter().map(|shift| self.course(&shift.course_id));
        let courses = join_all(lookups).await;
        Ok(shifts
            .iter()
            .zip(courses)
            .map(|(shift, course)| enrich(shift, course.ok().as_ref()))
            .collect())
    }

    pub async fn classroom(&self, id: &ClassroomId) -> Result<Classroom, StoreError> {
        self.fetch(Collection::Classrooms, &id.0).await
    }

    pub async fn classrooms(&self) -> Result<Vec<Classroom>, StoreError> {
        self.fetch_all(Collection::Classrooms, &[]).await
    }

    pub async fn buildings(&self) -> Result<Vec<Building>, StoreError> {
        self.fetch_all(Collection::Buildings, &[]).await
    }

    pub async fn teacher(&self, id: &TeacherId) -> Result<Teacher, StoreError> {
        self.fetch(Collection::Teachers, &id.0).await
    }

    pub async fn degrees(&self) -> Result<Vec<Degree>, StoreError> {
        self.fetch_all(Collection::Degrees, &[]).await
    }

    pub async fn allocation(&self, id: &str) -> Result<Allocation, StoreError> {
        self.fetch(Collection::Allocations, id).await
    }

    pub async fn allocations_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Allocation>, StoreError> {
        self.fetch_all(
            Collection::Allocations,
            &[Filter::eq("studentId", student.0.as_str())],
        )
        .await
    }

    pub async fn allocations_for_shift(
        &self,
        shift: &ShiftId,
    ) -> Result<Vec<Allocation>, StoreError> {
        self.fetch_all(
            Collection::Allocations,
            &[Filter::eq("shiftId", shift.0.as_str())],
        )
        .await
    }

    pub async fn allocation_between(
        &self,
        student: &StudentId,
        shift: &ShiftId,
    ) -> Result<Option<Allocation>, StoreError> {
        let matches: Vec<Allocation> = self
            .fetch_all(
                Collection::Allocations,
                &[
                    Filter::eq("studentId", student.0.as_str()),
                    Filter::eq("shiftId", shift.0.as_str()),
                ],
            )
            .await?;
        Ok(matches.into_iter().next())
    }

    pub async fn create_allocation(
        &self,
        student: &StudentId,
        shift: &ShiftId,
    ) -> Result<Allocation, StoreError> {
        self.create_numbered(Collection::Allocations, |id| Allocation {
            id,
            student_id: student.clone(),
            shift_id: shift.clone(),
        })
        .await
    }

    pub async fn delete_allocation(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(Collection::Allocations, id).await
    }

    pub async fn shift_request(&self, id: &RequestId) -> Result<ShiftRequest, StoreError> {
        self.fetch(Collection::ShiftRequests, &id.0).await
    }

    pub async fn shift_requests(
        &self,
        filters: &[Filter],
    ) -> Result<Vec<ShiftRequest>, StoreError> {
        self.fetch_all(Collection::ShiftRequests, filters).await
    }

    pub async fn classroom_request(&self, id: &RequestId) -> Result<ClassroomRequest, StoreError> {
        self.fetch(Collection::ClassroomRequests, &id.0).await
    }

    pub async fn classroom_requests(
        &self,
        filters: &[Filter],
    ) -> Result<Vec<ClassroomRequest>, StoreError> {
        self.fetch_all(Collection::ClassroomRequests, filters).await
    }

    pub async fn conflicts(&self) -> Result<Vec<Conflict>, StoreError> {
        self.fetch_all(Collection::Conflicts, &[]).await
    }

    pub async fn conflicts_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<Conflict>, StoreError> {
        self.fetch_all(
            Collection::Conflicts,
            &[Filter::eq("studentId", student.0.as_str())],
        )
        .await
    }

    pub async fn schedule_notice(&self, id: &str) -> Result<ScheduleNotice, StoreError> {
        self.fetch(Collection::Notifications, id).await
    }

    pub async fn schedule_notices_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<ScheduleNotice>, StoreError> {
        self.fetch_all(
            Collection::Notifications,
            &[
                Filter::eq("studentId", student.0.as_str()),
                Filter::eq("type", SCHEDULE_UPDATE_KIND),
            ],
        )
        .await
    }
}

/// Numeric value of a record id, tolerating both string and number JSON ids.
fn numeric_id(record: &Value) -> Option<u64> {
    match record.get("id") {
        Some(Value::String(raw)) => raw.parse().ok(),
        Some(Value::Number(number)) => number.as_u64(),
        _ => None,
    }
}
