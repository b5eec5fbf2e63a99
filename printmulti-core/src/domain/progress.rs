//! Progress record domain type
//!
//! The record is the whole-document JSON persisted per job id and is the
//! only state a polling client ever sees. Absent fields are omitted from the
//! wire form, so partial documents like `{"status": "ongoing"}` and the
//! final `{"status": "done", "getURL": …}` stay byte-stable.

use serde::{Deserialize, Serialize};

/// Lifecycle status of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Ongoing,
    Done,
    Failed,
}

/// Durable progress document for one job id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub status: ProgressStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesize: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<u64>,
    #[serde(rename = "getURL", skip_serializing_if = "Option::is_none")]
    pub get_url: Option<String>,
}

impl ProgressRecord {
    /// Record written at submission time, before partitioning.
    pub fn ongoing() -> Self {
        Self {
            status: ProgressStatus::Ongoing,
            done: None,
            total: None,
            merged: None,
            filesize: None,
            written: None,
            get_url: None,
        }
    }

    /// Record written once the job count is known.
    pub fn started(total: u32) -> Self {
        Self {
            done: Some(0),
            total: Some(total),
            ..Self::ongoing()
        }
    }

    /// Final record; replaces the document wholesale.
    pub fn done(get_url: String) -> Self {
        Self {
            status: ProgressStatus::Done,
            get_url: Some(get_url),
            ..Self::ongoing()
        }
    }

    pub fn increment_done(&mut self) {
        self.done = Some(self.done.unwrap_or(0) + 1);
    }

    /// Flags the record failed while preserving the counters already
    /// reported to pollers.
    pub fn mark_failed(&mut self) {
        self.status = ProgressStatus::Failed;
    }
}
