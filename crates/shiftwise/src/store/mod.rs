//! Collection-oriented resource store contract.
//!
//! The engine reads and writes named collections of JSON records through
//! [`ResourceStore`]. Backends stay dumb: filtering is plain field equality,
//! ids are opaque strings, and all policy (id issuance, counters, invariants)
//! lives in the workflows. [`InMemoryStore`] is the bundled backend used by
//! tests, the demo, and local serving.

mod memory;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

pub use memory::InMemoryStore;

/// Collections the engine knows about. Names match the persisted layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Students,
    Courses,
    Shifts,
    Allocations,
    Classrooms,
    Buildings,
    Teachers,
    Degrees,
    ShiftRequests,
    ClassroomRequests,
    Conflicts,
    Notifications,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Collection::Students => "students",
            Collection::Courses => "courses",
            Collection::Shifts => "shifts",
            Collection::Allocations => "allocations",
            Collection::Classrooms => "classrooms",
            Collection::Buildings => "buildings",
            Collection::Teachers => "teachers",
            Collection::Degrees => "degrees",
            Collection::ShiftRequests => "shiftRequests",
            Collection::ClassroomRequests => "classroomRequests",
            Collection::Conflicts => "conflicts",
            Collection::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
}

/// Field predicate for `list`. A field absent from a record compares as JSON
/// null, so `Ne(null)` means "field present and non-null".
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Eq,
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op: FilterOp::Ne,
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Value) -> bool {
        let actual = record.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            FilterOp::Eq => *actual == self.value,
            FilterOp::Ne => *actual != self.value,
        }
    }
}

/// Failures surfaced by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no record '{id}' in {collection}")]
    NotFound { collection: Collection, id: String },
    #[error("record in {collection} failed to decode: {source}")]
    Decode {
        collection: Collection,
        #[source]
        source: serde_json::Error,
    },
    #[error("store transport failure: {0}")]
    Transport(String),
}

/// Storage abstraction over named collections of JSON records.
///
/// `update` replaces the whole record and fails with `NotFound` when the id
/// is absent. `delete` of an absent id succeeds; removal callers treat that
/// as already done.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn list(&self, collection: Collection, filters: &[Filter])
        -> Result<Vec<Value>, StoreError>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Value, StoreError>;

    async fn create(&self, collection: Collection, record: Value) -> Result<Value, StoreError>;

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        record: Value,
    ) -> Result<Value, StoreError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;
}

/// The `id` field of a record, when it is a string.
pub fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}
