//! Worker
//!
//! Executes one partition job: checks the cancellation marker, issues the
//! single backend request, maps the response to the local partial-artifact
//! path, and bumps the shared done counter. Failures of any kind are folded
//! into an absent artifact; nothing escapes the worker boundary.

use std::path::PathBuf;
use std::sync::Arc;

use printmulti_client::{ClientError, RenderBackend};
use printmulti_core::domain::job::{PrintJob, RenderOutcome};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use url::Url;

use crate::repository::{CancelSignal, ProgressStore};

/// Shared handles every worker invocation runs against.
pub struct WorkerContext {
    pub backend: Arc<dyn RenderBackend>,
    pub store: ProgressStore,
    pub cancel: CancelSignal,
    /// Per-submission lock serializing progress mutations
    pub lock: Arc<Mutex<()>>,
    pub print_temp_dir: PathBuf,
    /// Filename prefix of partial artifacts
    pub file_prefix: String,
    pub log_spec_files: bool,
}

/// Runs one job to completion. Always returns an outcome; an absent
/// artifact is the only failure signal.
pub async fn run_job(job: &PrintJob, ctx: &WorkerContext) -> RenderOutcome {
    let timestamp = job.timestamp.clone();

    debug!(
        "[worker {}] Printing individual PDF (timestamp={:?})",
        job.job_id, timestamp
    );

    // Cooperative cancellation: probe before contacting the backend
    if ctx.cancel.is_cancelled(&job.job_id).await {
        debug!("[worker {}] Submission cancelled, skipping", job.job_id);
        return RenderOutcome::failed(timestamp);
    }

    if ctx.log_spec_files {
        debug!("[worker {}] spec: {}", job.job_id, job.spec.as_value());
    }

    debug!(
        "[worker {}] Sending create request to {}",
        job.job_id, job.backend_url
    );
    let created = match ctx
        .backend
        .create_print(&job.backend_url, &job.spec, job.referer.as_deref())
        .await
    {
        Ok(created) => created,
        Err(ClientError::BackendRejected { status, message }) => {
            error!(
                "[worker {}] Backend rejected timestamp {:?} with status {}",
                job.job_id, timestamp, status
            );
            error!("[worker {}] response: {}", job.job_id, message);
            error!("[worker {}] spec: {}", job.job_id, job.spec.as_value());
            error!("[worker {}] url: {}", job.job_id, job.backend_url);
            return RenderOutcome::failed(timestamp);
        }
        Err(err) => {
            error!(
                "[worker {}] Request to {} failed: {}",
                job.job_id, job.backend_url, err
            );
            return RenderOutcome::failed(timestamp);
        }
    };

    debug!(
        "[worker {}] Backend response has reference: {}",
        job.job_id, created.get_url
    );
    let Some(basename) = artifact_basename(&created.get_url) else {
        error!(
            "[worker {}] Unusable backend reference for timestamp {:?}: {}",
            job.job_id, timestamp, created.get_url
        );
        return RenderOutcome::failed(timestamp);
    };

    let local = ctx
        .print_temp_dir
        .join(format!("{}{}", ctx.file_prefix, basename));
    info!(
        "[worker {}] Partial PDF for timestamp {:?} available at {}",
        job.job_id,
        timestamp,
        local.display()
    );

    // The one unexpected-failure path: the shared counter cannot be
    // advanced. The record keeps its counters and flips to failed.
    if let Err(err) = ctx.store.increment_done(&job.job_id, &ctx.lock).await {
        error!(
            "[worker {}] Cannot update progress: {:?}",
            job.job_id, err
        );
        if let Err(err) = ctx.store.mark_failed(&job.job_id, &ctx.lock).await {
            error!(
                "[worker {}] Cannot flag progress as failed: {:?}",
                job.job_id, err
            );
        }
        return RenderOutcome::failed(timestamp);
    }

    RenderOutcome::succeeded(timestamp, local)
}

/// Extracts the basename of the file the backend's reference points at.
/// Only the basename matters; the artifact is reachable on the shared
/// volume under the configured prefix.
fn artifact_basename(reference: &str) -> Option<String> {
    let path = match Url::parse(reference) {
        Ok(url) => url.path().to_string(),
        // Relative reference: strip query and fragment by hand
        Err(_) => reference
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let name = path.rsplit('/').next().unwrap_or_default();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use printmulti_core::domain::progress::{ProgressRecord, ProgressStatus};
    use printmulti_core::domain::spec::PrintSpec;
    use printmulti_core::dto::BackendCreated;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Scripted backend: per-call behavior keyed by invocation count.
    pub(crate) struct ScriptedBackend {
        pub calls: AtomicUsize,
        pub script: Box<dyn Fn(usize) -> printmulti_client::Result<BackendCreated> + Send + Sync>,
    }

    impl ScriptedBackend {
        pub fn always_ok() -> Self {
            Self::new(|_| {
                Ok(BackendCreated {
                    get_url: "http://backend/print42.pdf.printout".to_string(),
                })
            })
        }

        pub fn new(
            script: impl Fn(usize) -> printmulti_client::Result<BackendCreated> + Send + Sync + 'static,
        ) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                script: Box::new(script),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RenderBackend for ScriptedBackend {
        async fn create_print(
            &self,
            _url: &str,
            _spec: &PrintSpec,
            _referer: Option<&str>,
        ) -> printmulti_client::Result<BackendCreated> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            (self.script)(call)
        }

        async fn checker(&self, _url: &str, _referer: &str) -> printmulti_client::Result<String> {
            Ok("OK".to_string())
        }
    }

    pub(crate) fn test_context(dir: &TempDir, backend: Arc<ScriptedBackend>) -> WorkerContext {
        use crate::repository::ReadBackoff;
        use std::time::Duration;

        WorkerContext {
            backend,
            store: ProgressStore::new(dir.path(), "mapfish-multiprint").with_read_backoff(
                ReadBackoff {
                    initial: Duration::from_millis(1),
                    max: Duration::from_millis(4),
                    budget: Duration::from_millis(20),
                },
            ),
            cancel: CancelSignal::new(dir.path(), "mapfish-multiprint"),
            lock: Arc::new(Mutex::new(())),
            print_temp_dir: dir.path().to_path_buf(),
            file_prefix: "mapfish-print".to_string(),
            log_spec_files: false,
        }
    }

    pub(crate) fn test_job(job_id: &str, timestamp: Option<&str>) -> PrintJob {
        PrintJob {
            index: 0,
            backend_url: "https://backend/print/create.json".to_string(),
            referer: None,
            timestamp: timestamp.map(str::to_string),
            layers: Vec::new(),
            spec: PrintSpec::new(json!({"layers": []})),
            job_id: job_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_success_derives_local_path_and_increments() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::always_ok());
        let ctx = test_context(&dir, Arc::clone(&backend));
        ctx.store
            .write("240805", &ProgressRecord::started(1))
            .await
            .unwrap();

        let outcome = run_job(&test_job("240805", Some("19991231")), &ctx).await;

        let artifact = outcome.artifact.expect("artifact expected");
        assert!(artifact.ends_with("mapfish-printprint42.pdf.printout"));
        assert_eq!(outcome.timestamp.as_deref(), Some("19991231"));
        assert_eq!(ctx.store.read("240805").await.unwrap().done, Some(1));
    }

    #[tokio::test]
    async fn test_cancelled_job_issues_no_backend_call() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::always_ok());
        let ctx = test_context(&dir, Arc::clone(&backend));
        ctx.cancel.request("240805").await.unwrap();

        let outcome = run_job(&test_job("240805", Some("19991231")), &ctx).await;

        assert!(outcome.is_failure());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_backend_rejection_becomes_absent_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new(|_| {
            Err(ClientError::rejected(500, "printer on fire"))
        }));
        let ctx = test_context(&dir, Arc::clone(&backend));
        ctx.store
            .write("240805", &ProgressRecord::started(1))
            .await
            .unwrap();

        let outcome = run_job(&test_job("240805", Some("19991231")), &ctx).await;

        assert!(outcome.is_failure());
        assert_eq!(backend.call_count(), 1);
        // A plain rejection leaves the record ongoing for the retry pass
        let record = ctx.store.read("240805").await.unwrap();
        assert_eq!(record.status, ProgressStatus::Ongoing);
        assert_eq!(record.done, Some(0));
    }

    #[tokio::test]
    async fn test_unusable_reference_becomes_absent_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::new(|_| {
            Ok(BackendCreated {
                get_url: "http://backend/".to_string(),
            })
        }));
        let ctx = test_context(&dir, Arc::clone(&backend));

        let outcome = run_job(&test_job("240805", None), &ctx).await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn test_progress_failure_becomes_absent_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend::always_ok());
        let ctx = test_context(&dir, Arc::clone(&backend));
        // Undecodable info file: increment cannot proceed
        tokio::fs::write(ctx.store.info_path("240805"), b"not json")
            .await
            .unwrap();

        let outcome = run_job(&test_job("240805", Some("19991231")), &ctx).await;
        assert!(outcome.is_failure());
    }

    #[test]
    fn test_artifact_basename() {
        assert_eq!(
            artifact_basename("http://x/mapfish-print123.pdf.printout"),
            Some("mapfish-print123.pdf.printout".to_string())
        );
        assert_eq!(
            artifact_basename("http://x/a/b/c.pdf?token=1"),
            Some("c.pdf".to_string())
        );
        assert_eq!(
            artifact_basename("141028163227.pdf.printout"),
            Some("141028163227.pdf.printout".to_string())
        );
        assert_eq!(artifact_basename("http://x/"), None);
        assert_eq!(artifact_basename(""), None);
    }
}
