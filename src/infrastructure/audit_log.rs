use crate::domain::audit::AuditEntry;
use crate::domain::ports::AuditLog;
use crate::error::{Result, ServiceError};
use crate::sync::KeyedLocks;
use async_trait::async_trait;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const ACTIVE_EXT: &str = "log";
const ARCHIVE_EXT: &str = "zip";

/// File-backed audit log.
///
/// Active logs are `<dir>/<id>.log` with one JSON entry per line. Rotation
/// deflates a log into `<dir>/<archive_id>.zip` and truncates the active
/// file; appends and rotation of the same id are serialized.
#[derive(Debug, Clone)]
pub struct FileAuditLog {
    dir: PathBuf,
    locks: KeyedLocks,
}

impl FileAuditLog {
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            locks: KeyedLocks::new(),
        })
    }

    fn file(&self, id: &str, ext: &str) -> Result<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(ServiceError::ValidationError(format!(
                "Invalid log id: {id:?}"
            )));
        }
        Ok(self.dir.join(format!("{id}.{ext}")))
    }
}

fn compress(content: String, log_id: String, archive_path: PathBuf) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&archive_path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(format!("{log_id}.{ACTIVE_EXT}"), options)?;
    zip.write_all(content.as_bytes())?;
    zip.finish()?;
    Ok(())
}

fn decompress(archive_path: PathBuf) -> Result<String> {
    let file = std::fs::File::open(&archive_path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            ServiceError::NotFound(archive_path.display().to_string())
        } else {
            ServiceError::IoError(e)
        }
    })?;
    let mut archive = ZipArchive::new(file)?;
    let mut entry = archive.by_index(0)?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

async fn join_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T> + Send + 'static,
) -> Result<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ServiceError::InternalError(Box::new(e)))?
}

#[async_trait]
impl AuditLog for FileAuditLog {
    async fn append(&self, log_id: &str, entry: &AuditEntry) -> Result<()> {
        let path = self.file(log_id, ACTIVE_EXT)?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.locks.lock(log_id).await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn list(&self, include_archived: bool) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let (Some(stem), Some(ext)) = (
                path.file_stem().and_then(|s| s.to_str()),
                path.extension().and_then(|s| s.to_str()),
            ) else {
                continue;
            };
            if ext == ACTIVE_EXT || (include_archived && ext == ARCHIVE_EXT) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn rotate(&self, log_id: &str, archive_id: &str) -> Result<()> {
        let active = self.file(log_id, ACTIVE_EXT)?;
        let archive = self.file(archive_id, ARCHIVE_EXT)?;

        let _guard = self.locks.lock(log_id).await;
        let content = fs::read_to_string(&active).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ServiceError::NotFound(format!("audit log {log_id}"))
            } else {
                ServiceError::IoError(e)
            }
        })?;

        let id = log_id.to_string();
        join_blocking(move || compress(content, id, archive)).await?;

        fs::File::create(&active).await?;
        Ok(())
    }

    async fn read_active(&self, log_id: &str) -> Result<String> {
        let path = self.file(log_id, ACTIVE_EXT)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_archive(&self, archive_id: &str) -> Result<String> {
        let path = self.file(archive_id, ARCHIVE_EXT)?;
        join_blocking(move || decompress(path)).await
    }
}
