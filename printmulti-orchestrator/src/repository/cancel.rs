//! Cancellation signal
//!
//! Cancellation is a marker file per job id. Creation is idempotent, the
//! probe is a pure existence test, and the orchestration never deletes the
//! marker; the retention sweep owns cleanup.

use std::path::PathBuf;

/// Marker-file cancellation signal
#[derive(Debug, Clone)]
pub struct CancelSignal {
    dir: PathBuf,
    multi_prefix: String,
}

impl CancelSignal {
    pub fn new(dir: impl Into<PathBuf>, multi_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            multi_prefix: multi_prefix.into(),
        }
    }

    /// Path of the cancel marker for one job id
    pub fn marker_path(&self, job_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}.cancel", self.multi_prefix, job_id))
    }

    /// Requests cancellation; creating an existing marker is a no-op
    pub async fn request(&self, job_id: &str) -> std::io::Result<()> {
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.marker_path(job_id))
            .await?;
        Ok(())
    }

    /// Whether cancellation was requested for this job id
    pub async fn is_cancelled(&self, job_id: &str) -> bool {
        tokio::fs::try_exists(self.marker_path(job_id))
            .await
            .unwrap_or(false)
    }
}
