use crate::domain::ports::{Collection, RecordStore};
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// A record store that keeps one pretty-printed JSON file per record under
/// `<base>/<collection>/<key>.json`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// single-key update is atomic on POSIX filesystems.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    base_dir: PathBuf,
}

impl FileRecordStore {
    /// Opens the store rooted at `base_dir`, creating one directory per collection.
    pub async fn open<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        for collection in Collection::ALL {
            fs::create_dir_all(base_dir.join(collection.as_str())).await?;
        }
        Ok(Self { base_dir })
    }

    fn path(&self, collection: Collection, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(ServiceError::ValidationError(format!(
                "Invalid record key: {key:?}"
            )));
        }
        Ok(self
            .base_dir
            .join(collection.as_str())
            .join(format!("{key}.json")))
    }

    async fn write_atomic(path: &Path, record: &serde_json::Value) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(record)?;
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn map_not_found(e: std::io::Error, collection: Collection, key: &str) -> ServiceError {
    if e.kind() == ErrorKind::NotFound {
        ServiceError::NotFound(format!("{collection}/{key}"))
    } else {
        ServiceError::IoError(e)
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn create(
        &self,
        collection: Collection,
        key: &str,
        record: serde_json::Value,
    ) -> Result<()> {
        let path = self.path(collection, key)?;
        let bytes = serde_json::to_vec_pretty(&record)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    ServiceError::Exists(format!("{collection}/{key}"))
                } else {
                    ServiceError::IoError(e)
                }
            })?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn read(&self, collection: Collection, key: &str) -> Result<serde_json::Value> {
        let path = self.path(collection, key)?;
        let bytes = fs::read(&path)
            .await
            .map_err(|e| map_not_found(e, collection, key))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn update(
        &self,
        collection: Collection,
        key: &str,
        record: serde_json::Value,
    ) -> Result<()> {
        let path = self.path(collection, key)?;
        fs::metadata(&path)
            .await
            .map_err(|e| map_not_found(e, collection, key))?;
        Self::write_atomic(&path, &record).await
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<()> {
        let path = self.path(collection, key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| map_not_found(e, collection, key))
    }

    async fn list(&self, collection: Collection) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(self.base_dir.join(collection.as_str())).await?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(key) = name.to_str().and_then(|n| n.strip_suffix(".json")) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
