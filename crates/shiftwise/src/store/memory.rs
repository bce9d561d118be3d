use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{record_id, Collection, Filter, ResourceStore, StoreError};

/// In-memory [`ResourceStore`] keeping each collection in insertion order.
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert records as-is, bypassing id issuance. Fixture seeding only.
    pub async fn seed(&self, collection: Collection, records: Vec<Value>) {
        let mut guard = self.collections.write().await;
        guard.entry(collection).or_default().extend(records);
    }

    /// Current contents of a collection in insertion order.
    pub async fn snapshot(&self, collection: Collection) -> Vec<Value> {
        let guard = self.collections.read().await;
        guard.get(&collection).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn list(
        &self,
        collection: Collection,
        filters: &[Filter],
    ) -> Result<Vec<Value>, StoreError> {
        let guard = self.collections.read().await;
        let records = match guard.get(&collection) {
            Some(records) => records.as_slice(),
            None => &[],
        };
        Ok(records
            .iter()
            .filter(|record| filters.iter().all(|filter| filter.matches(record)))
            .cloned()
            .collect())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Value, StoreError> {
        let guard = self.collections.read().await;
        guard
            .get(&collection)
            .and_then(|records| records.iter().find(|record| record_id(record) == Some(id)))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                collection,
                id: id.to_string(),
            })
    }

    async fn create(&self, collection: Collection, record: Value) -> Result<Value, StoreError> {
        let mut guard = self.collections.write().await;
        guard.entry(collection).or_default().push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        record: Value,
    ) -> Result<Value, StoreError> {
        let mut guard = self.collections.write().await;
        let records = guard.entry(collection).or_default();
        match records
            .iter_mut()
            .find(|existing| record_id(existing) == Some(id))
        {
            Some(slot) => {
                *slot = record.clone();
                Ok(record)
            }
            None => Err(StoreError::NotFound {
                collection,
                id: id.to_string(),
            }),
        }
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        if let Some(records) = guard.get_mut(&collection) {
            records.retain(|record| record_id(record) != Some(id));
        }
        Ok(())
    }
}
