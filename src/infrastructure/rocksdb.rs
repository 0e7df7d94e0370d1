use crate::domain::ports::{Collection, RecordStore};
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// A persistent record store implementation using RocksDB.
///
/// Each [`Collection`] lives in its own Column Family named after it, keyed by
/// the record key's UTF-8 bytes with JSON values.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that one column family per collection exists.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = Collection::ALL
            .iter()
            .map(|c| ColumnFamilyDescriptor::new(c.as_str(), Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, collection: Collection) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(collection.as_str()).ok_or_else(|| {
            ServiceError::internal(format!("{collection} column family not found"))
        })
    }

    fn exists(&self, collection: Collection, key: &str) -> Result<bool> {
        let cf = self.cf(collection)?;
        // Just check if the key exists without retrieving the value
        Ok(self.db.get_pinned_cf(cf, key.as_bytes())?.is_some())
    }
}

// RocksDB calls are synchronous; each is a single short key operation.
#[async_trait]
impl RecordStore for RocksDBStore {
    async fn create(
        &self,
        collection: Collection,
        key: &str,
        record: serde_json::Value,
    ) -> Result<()> {
        if self.exists(collection, key)? {
            return Err(ServiceError::Exists(format!("{collection}/{key}")));
        }
        let value = serde_json::to_vec(&record)?;
        self.db.put_cf(self.cf(collection)?, key.as_bytes(), value)?;
        Ok(())
    }

    async fn read(&self, collection: Collection, key: &str) -> Result<serde_json::Value> {
        match self.db.get_cf(self.cf(collection)?, key.as_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Err(ServiceError::NotFound(format!("{collection}/{key}"))),
        }
    }

    async fn update(
        &self,
        collection: Collection,
        key: &str,
        record: serde_json::Value,
    ) -> Result<()> {
        if !self.exists(collection, key)? {
            return Err(ServiceError::NotFound(format!("{collection}/{key}")));
        }
        let value = serde_json::to_vec(&record)?;
        self.db.put_cf(self.cf(collection)?, key.as_bytes(), value)?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<()> {
        if !self.exists(collection, key)? {
            return Err(ServiceError::NotFound(format!("{collection}/{key}")));
        }
        self.db.delete_cf(self.cf(collection)?, key.as_bytes())?;
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<String>> {
        let cf = self.cf(collection)?;
        let mut keys = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (key, _value) = item?;
            let key = String::from_utf8(key.to_vec()).map_err(|e| {
                ServiceError::internal(format!("Non UTF-8 key in {collection}: {e}"))
            })?;
            keys.push(key);
        }
        Ok(keys)
    }
}
