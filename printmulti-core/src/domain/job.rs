//! Per-timestamp job types
//!
//! One `PrintJob` is created per resolved timestamp (or exactly one when the
//! spec has no time dimension). Jobs are immutable once partitioned and are
//! consumed by a worker at most twice (initial attempt plus one retry).

use std::path::PathBuf;

use crate::domain::spec::PrintSpec;

/// One unit of print work dispatched to the backend renderer.
#[derive(Debug, Clone)]
pub struct PrintJob {
    /// Position in the partition order; results are reassembled by it.
    pub index: usize,
    /// Fully-built backend create URL.
    pub backend_url: String,
    /// Referer forwarded from the submitting client, if any.
    pub referer: Option<String>,
    /// Timestamp rendered by this job; `None` for the single-job case.
    pub timestamp: Option<String>,
    /// Indices of the layers affected at this timestamp.
    pub layers: Vec<usize>,
    /// Deep copy of the spec, already rewritten for this timestamp.
    pub spec: PrintSpec,
    /// Submission-wide id keying progress and cancellation state.
    pub job_id: String,
}

/// Outcome of one worker invocation.
///
/// An absent artifact means the attempt failed; workers never raise past
/// their own boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub timestamp: Option<String>,
    pub artifact: Option<PathBuf>,
}

impl RenderOutcome {
    pub fn succeeded(timestamp: Option<String>, artifact: PathBuf) -> Self {
        Self {
            timestamp,
            artifact: Some(artifact),
        }
    }

    pub fn failed(timestamp: Option<String>) -> Self {
        Self {
            timestamp,
            artifact: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.artifact.is_none()
    }
}
