use crate::domain::ports::{Collection, RecordStore};
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Records = HashMap<(Collection, String), serde_json::Value>;

/// A thread-safe in-memory record store.
///
/// Uses `Arc<RwLock<HashMap<..>>>` to allow shared concurrent access.
/// Ideal for testing or short-lived runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<Records>>,
}

impl InMemoryRecordStore {
    /// Creates a new, empty in-memory record store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(collection: Collection, key: &str) -> ServiceError {
    ServiceError::NotFound(format!("{collection}/{key}"))
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(
        &self,
        collection: Collection,
        key: &str,
        record: serde_json::Value,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        let slot = (collection, key.to_string());
        if records.contains_key(&slot) {
            return Err(ServiceError::Exists(format!("{collection}/{key}")));
        }
        records.insert(slot, record);
        Ok(())
    }

    async fn read(&self, collection: Collection, key: &str) -> Result<serde_json::Value> {
        let records = self.records.read().await;
        records
            .get(&(collection, key.to_string()))
            .cloned()
            .ok_or_else(|| not_found(collection, key))
    }

    async fn update(
        &self,
        collection: Collection,
        key: &str,
        record: serde_json::Value,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        match records.get_mut(&(collection, key.to_string())) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(not_found(collection, key)),
        }
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<()> {
        let mut records = self.records.write().await;
        records
            .remove(&(collection, key.to_string()))
            .map(|_| ())
            .ok_or_else(|| not_found(collection, key))
    }

    async fn list(&self, collection: Collection) -> Result<Vec<String>> {
        let records = self.records.read().await;
        let mut keys: Vec<String> = records
            .keys()
            .filter(|(c, _)| *c == collection)
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_record_store() {
        let store = InMemoryRecordStore::new();
        let record = json!({"id": "a", "n": 1});

        store
            .create(Collection::Orders, "a", record.clone())
            .await
            .unwrap();
        assert_eq!(store.read(Collection::Orders, "a").await.unwrap(), record);

        assert!(matches!(
            store.create(Collection::Orders, "a", json!({})).await,
            Err(ServiceError::Exists(_))
        ));
        assert!(matches!(
            store.read(Collection::Users, "a").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_in_memory_update_delete_list() {
        let store = InMemoryRecordStore::new();
        store.create(Collection::Orders, "b", json!(1)).await.unwrap();
        store.create(Collection::Orders, "a", json!(2)).await.unwrap();
        store.create(Collection::Tokens, "t", json!(3)).await.unwrap();

        assert_eq!(
            store.list(Collection::Orders).await.unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );

        store.update(Collection::Orders, "a", json!(5)).await.unwrap();
        assert_eq!(store.read(Collection::Orders, "a").await.unwrap(), json!(5));
        assert!(store.update(Collection::Orders, "zz", json!(0)).await.is_err());

        store.delete(Collection::Orders, "a").await.unwrap();
        assert!(store.delete(Collection::Orders, "a").await.is_err());
        assert_eq!(store.list(Collection::Orders).await.unwrap(), vec!["b".to_string()]);
    }
}
