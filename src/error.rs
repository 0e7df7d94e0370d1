use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Forbidden: missing required token, or token is invalid")]
    Forbidden,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Record already exists: {0}")]
    Exists(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Integrity fault: {0}")]
    IntegrityFault(String),
    #[error("Partial failure: {message} (failed: {})", .failed.join(", "))]
    PartialFailure { message: String, failed: Vec<String> },
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
    #[error("Notification error: {0}")]
    NotificationError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(Box::new(std::io::Error::other(message.into())))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for ServiceError {
    fn from(e: rocksdb::Error) -> Self {
        Self::InternalError(Box::new(e))
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
