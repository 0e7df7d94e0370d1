use crate::domain::now_millis;
use crate::domain::ports::AuditLogRef;
use crate::error::Result;

/// Result of one rotation pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RotationReport {
    /// `(log id, archive id)` for every log that was archived.
    pub rotated: Vec<(String, String)>,
    /// Logs that had no content and were left alone.
    pub empty: Vec<String>,
    pub failures: Vec<(String, String)>,
}

/// Archives every active audit log and starts it over empty.
#[derive(Clone)]
pub struct LogRotator {
    audit: AuditLogRef,
}

impl LogRotator {
    pub fn new(audit: AuditLogRef) -> Self {
        Self { audit }
    }

    /// Rotates each non-empty active log into `<id>-<epoch millis>`.
    ///
    /// A failure on one log is recorded in the report and does not stop the
    /// others.
    pub async fn rotate_all(&self) -> Result<RotationReport> {
        let mut report = RotationReport::default();
        for log_id in self.audit.list(false).await? {
            match self.rotate_one(&log_id).await {
                Ok(Some(archive_id)) => report.rotated.push((log_id, archive_id)),
                Ok(None) => report.empty.push(log_id),
                Err(e) => {
                    tracing::error!(log_id = %log_id, error = %e, "Error rotating log");
                    report.failures.push((log_id, e.to_string()));
                }
            }
        }
        tracing::info!(
            rotated = report.rotated.len(),
            empty = report.empty.len(),
            failed = report.failures.len(),
            "Log rotation finished"
        );
        Ok(report)
    }

    async fn rotate_one(&self, log_id: &str) -> Result<Option<String>> {
        if self.audit.read_active(log_id).await?.is_empty() {
            return Ok(None);
        }
        let archive_id = format!("{log_id}-{}", now_millis());
        self.audit.rotate(log_id, &archive_id).await?;
        tracing::debug!(log_id, archive_id = %archive_id, "Log rotated");
        Ok(Some(archive_id))
    }
}
