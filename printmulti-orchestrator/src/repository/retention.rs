//! Retention sweep
//!
//! Removes temporary artifacts older than the retention window. Runs on
//! every submission; an external cron owns the authoritative cleanup, this
//! pass just keeps the shared volume from growing between cron runs.

use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

/// Deletes regular files in `dir` whose modification time is older than
/// `max_age`. Returns the number of files removed; errors are logged and
/// skipped.
pub async fn sweep_old_files(dir: &Path, max_age: Duration) -> usize {
    let mut removed = 0;
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Cannot sweep {}: {}", dir.display(), err);
            return 0;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age <= max_age {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Swept {}", path.display());
                removed += 1;
            }
            Err(err) => debug!("Could not sweep {}: {}", path.display(), err),
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sweep_removes_only_expired_files() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("stale.pdf.printout");
        tokio::fs::write(&stale, b"pdf").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // A generous window keeps everything
        assert_eq!(sweep_old_files(dir.path(), Duration::from_secs(3600)).await, 0);
        assert!(stale.exists());

        // A zero window removes the (now aged) file
        assert_eq!(sweep_old_files(dir.path(), Duration::ZERO).await, 1);
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn test_sweep_missing_dir_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        assert_eq!(sweep_old_files(&gone, Duration::ZERO).await, 0);
    }
}
