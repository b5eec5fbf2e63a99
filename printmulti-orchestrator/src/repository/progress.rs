//! Progress store
//!
//! Whole-document JSON persistence of the progress record, one file per job
//! id. Writes overwrite the document; reads absorb torn reads from
//! concurrent writers with a bounded exponential backoff. The
//! read-modify-write operations are serialized by the per-submission lock
//! the caller holds.

use std::path::{Path, PathBuf};
use std::time::Duration;

use printmulti_core::domain::progress::ProgressRecord;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Store error type
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Undecodable {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Read retry budget exhausted
    Unreadable {
        path: PathBuf,
    },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

/// Backoff policy for progress reads
#[derive(Debug, Clone, Copy)]
pub struct ReadBackoff {
    pub initial: Duration,
    pub max: Duration,
    /// Total wait budget across all attempts
    pub budget: Duration,
}

impl Default for ReadBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(200),
            max: Duration::from_secs(1),
            budget: Duration::from_secs(5),
        }
    }
}

/// File-backed progress store
#[derive(Debug, Clone)]
pub struct ProgressStore {
    dir: PathBuf,
    multi_prefix: String,
    backoff: ReadBackoff,
}

impl ProgressStore {
    pub fn new(dir: impl Into<PathBuf>, multi_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            multi_prefix: multi_prefix.into(),
            backoff: ReadBackoff::default(),
        }
    }

    /// Overrides the read backoff; tests shrink it to keep failure paths fast.
    pub fn with_read_backoff(mut self, backoff: ReadBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Path of the info file for one job id
    pub fn info_path(&self, job_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}.json", self.multi_prefix, job_id))
    }

    /// Whether an info file exists for this job id
    pub async fn exists(&self, job_id: &str) -> bool {
        tokio::fs::try_exists(self.info_path(job_id))
            .await
            .unwrap_or(false)
    }

    /// Overwrites the whole document
    pub async fn write(&self, job_id: &str, record: &ProgressRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(record).map_err(|source| StoreError::Undecodable {
            path: self.info_path(job_id),
            source,
        })?;
        tokio::fs::write(self.info_path(job_id), bytes).await?;
        Ok(())
    }

    /// Reads the document, retrying with bounded exponential backoff until
    /// the wait budget is exhausted
    pub async fn read(&self, job_id: &str) -> Result<ProgressRecord, StoreError> {
        let path = self.info_path(job_id);
        let started = Instant::now();
        let mut delay = self.backoff.initial;

        loop {
            match read_record(&path).await {
                Ok(record) => return Ok(record),
                Err(err) => {
                    if started.elapsed() + delay > self.backoff.budget {
                        warn!("Giving up reading {}: {:?}", path.display(), err);
                        return Err(StoreError::Unreadable { path });
                    }
                    debug!(
                        "Retrying read of {} in {:?}: {:?}",
                        path.display(),
                        delay,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.backoff.max);
                }
            }
        }
    }

    /// Increments the done counter under the shared lock
    pub async fn increment_done(&self, job_id: &str, lock: &Mutex<()>) -> Result<(), StoreError> {
        let _guard = lock.lock().await;
        let mut record = self.read(job_id).await?;
        record.increment_done();
        self.write(job_id, &record).await
    }

    /// Flags the record failed under the shared lock, preserving counters
    pub async fn mark_failed(&self, job_id: &str, lock: &Mutex<()>) -> Result<(), StoreError> {
        let _guard = lock.lock().await;
        let mut record = self.read(job_id).await?;
        record.mark_failed();
        self.write(job_id, &record).await
    }

    /// Removes the info file; merge-failure cleanup
    pub async fn delete_info(&self, job_id: &str) {
        if let Err(err) = tokio::fs::remove_file(self.info_path(job_id)).await {
            debug!("Could not remove info file for {}: {}", job_id, err);
        }
    }
}

async fn read_record(path: &Path) -> Result<ProgressRecord, StoreError> {
    let bytes = tokio::fs::read(path).await?;
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Undecodable {
        path: path.to_path_buf(),
        source,
    })
}
