//! Repository Module
//!
//! Durable-state layer for the orchestrator. The only cross-task shared
//! state is kept here: the per-job progress info file, the cancel marker,
//! and the retention sweep over the shared temp directory.

pub mod cancel;
pub mod progress;
pub mod retention;

pub use cancel::CancelSignal;
pub use progress::{ProgressStore, ReadBackoff, StoreError};
