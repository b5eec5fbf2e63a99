//! Service Module
//!
//! The orchestration engine: spec partitioning, worker execution, pooled or
//! sequential dispatch, the single-retry pass, and the ordered merge. The
//! API layer only ever calls [`orchestrator::spawn_orchestration`] and the
//! repository directly.

pub mod dispatch;
pub mod merge;
pub mod orchestrator;
pub mod partition;
pub mod retry;
pub mod worker;

pub use orchestrator::{OrchestrationOutcome, ServiceContext};
pub use partition::{LayerTimestampResolver, TimestampResolver};
pub use worker::WorkerContext;

use crate::repository::StoreError;

/// Orchestration error type
///
/// Every variant is terminal for the whole submission; nothing here ever
/// reaches the HTTP caller, which has long since received its job id.
#[derive(Debug)]
pub enum OrchestrationError {
    /// Movie-mode spec resolved zero timestamps
    NoTimestamps,
    /// A pooled worker task died; no retry or merge is attempted
    Pool(tokio::task::JoinError),
    /// A job failed its initial attempt and its single retry
    RetryExhausted {
        index: usize,
        timestamp: Option<String>,
    },
    /// The external concatenation utility failed
    MergeFailed(String),
    /// Progress state could not be read or written
    Store(StoreError),
}

impl From<StoreError> for OrchestrationError {
    fn from(err: StoreError) -> Self {
        OrchestrationError::Store(err)
    }
}

impl OrchestrationError {
    /// Distinguished termination code, logged with every abort
    pub fn code(&self) -> u8 {
        match self {
            OrchestrationError::Pool(_) => 1,
            OrchestrationError::RetryExhausted { .. } => 2,
            OrchestrationError::MergeFailed(_) => 3,
            OrchestrationError::NoTimestamps => 4,
            OrchestrationError::Store(_) => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinguished() {
        let errors = [
            OrchestrationError::NoTimestamps,
            OrchestrationError::RetryExhausted {
                index: 0,
                timestamp: None,
            },
            OrchestrationError::MergeFailed("boom".into()),
        ];
        let mut codes: Vec<u8> = errors.iter().map(|e| e.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }
}
