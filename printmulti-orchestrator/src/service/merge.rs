//! Merger
//!
//! Sorts the successful partial artifacts by timestamp, feeds them to the
//! external ordered-concatenation utility, and finalizes the progress
//! record. Pollers observe the merge advancing through the `merged` counter,
//! persisted after every appended artifact.

use std::path::PathBuf;
use std::time::Instant;

use printmulti_core::domain::job::RenderOutcome;
use printmulti_core::domain::progress::ProgressRecord;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::repository::ProgressStore;
use crate::service::OrchestrationError;

/// Merges the partial artifacts into the final document and returns its
/// public download URL.
pub async fn merge_artifacts(
    job_id: &str,
    scheme: &str,
    mut outcomes: Vec<RenderOutcome>,
    config: &Config,
    store: &ProgressStore,
) -> Result<String, OrchestrationError> {
    // Timestamp-ascending page order; the single no-timestamp job sorts
    // first by construction.
    outcomes.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    info!("[merge {}] Starting merge of {} PDF(s)", job_id, outcomes.len());

    let mut record = store.read(job_id).await?;
    record.merged = Some(0);
    store.write(job_id, &record).await?;

    let mut inputs: Vec<PathBuf> = Vec::with_capacity(outcomes.len());
    let mut expected_size: u64 = 0;
    for outcome in &outcomes {
        let Some(artifact) = &outcome.artifact else {
            continue;
        };
        match tokio::fs::metadata(artifact).await {
            Ok(metadata) => {
                expected_size += metadata.len();
                inputs.push(artifact.clone());
                record.merged = Some(record.merged.unwrap_or(0) + 1);
                store.write(job_id, &record).await?;
            }
            Err(err) => {
                // Merge what is there rather than nothing
                error!(
                    "[merge {}] Cannot append {}: {}",
                    job_id,
                    artifact.display(),
                    err
                );
            }
        }
    }

    record.filesize = Some(expected_size);
    record.written = Some(0);
    store.write(job_id, &record).await?;

    let output = config.merged_output_path(job_id);
    debug!(
        "[merge {}] Writing merged PDF ({} bytes expected) to {}",
        job_id,
        expected_size,
        output.display()
    );

    let started = Instant::now();
    let status = Command::new(&config.pdf_merge_command)
        .args(&inputs)
        .arg(&output)
        .status()
        .await;

    match status {
        Ok(status) if status.success() => {
            info!(
                "[merge {}] Merged PDF written to {} in {} ms",
                job_id,
                output.display(),
                started.elapsed().as_millis()
            );
        }
        Ok(status) => {
            error!(
                "[merge {}] {} exited with {} while merging {} file(s)",
                job_id,
                config.pdf_merge_command.display(),
                status,
                inputs.len()
            );
            cleanup_failed_merge(job_id, store, &output).await;
            return Err(OrchestrationError::MergeFailed(format!(
                "merge utility exited with {}",
                status
            )));
        }
        Err(err) => {
            error!(
                "[merge {}] Cannot run {}: {}",
                job_id,
                config.pdf_merge_command.display(),
                err
            );
            cleanup_failed_merge(job_id, store, &output).await;
            return Err(OrchestrationError::MergeFailed(err.to_string()));
        }
    }

    let download_url = config.download_url(scheme, job_id);
    store
        .write(job_id, &ProgressRecord::done(download_url.clone()))
        .await?;
    info!("[merge {}] PDF ready to download: {}", job_id, download_url);

    Ok(download_url)
}

/// Removes the info file and any partial output so pollers do not find a
/// half-merged artifact behind a stale record.
async fn cleanup_failed_merge(job_id: &str, store: &ProgressStore, output: &PathBuf) {
    store.delete_info(job_id).await;
    if let Err(err) = tokio::fs::remove_file(output).await {
        debug!(
            "[merge {}] Could not remove {}: {}",
            job_id,
            output.display(),
            err
        );
    }
}
