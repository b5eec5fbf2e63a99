//! Orchestration entry point
//!
//! Drives one submission end to end: partition the spec, record the job
//! count, dispatch the workers, gate on cancellation, repair failures once,
//! and merge. Runs detached from the submitting request; every terminal
//! state lands in the progress record or the log, never on the HTTP caller.

use std::sync::Arc;

use printmulti_client::{RenderBackend, UrlShortener};
use printmulti_core::domain::progress::ProgressRecord;
use printmulti_core::domain::spec::PrintSpec;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Config;
use crate::repository::{CancelSignal, ProgressStore};
use crate::service::partition::TimestampResolver;
use crate::service::worker::WorkerContext;
use crate::service::{OrchestrationError, dispatch, merge, partition, retry};

/// Shared handles the API layer and the orchestration engine run against.
pub struct ServiceContext {
    pub config: Config,
    pub store: ProgressStore,
    pub cancel: CancelSignal,
    pub backend: Arc<dyn RenderBackend>,
    pub shortener: Arc<dyn UrlShortener>,
    pub resolver: Arc<dyn TimestampResolver>,
}

/// Terminal state of a successful orchestration run.
#[derive(Debug, PartialEq, Eq)]
pub enum OrchestrationOutcome {
    Completed { download_url: String },
    /// Cancellation observed; success-shaped, no artifact produced.
    Cancelled,
}

/// Runs one submission to its terminal state.
pub async fn create_and_merge(
    ctx: &ServiceContext,
    spec: PrintSpec,
    scheme: &str,
    referer: Option<String>,
    job_id: &str,
) -> Result<OrchestrationOutcome, OrchestrationError> {
    let jobs = partition::partition_jobs(
        &spec,
        job_id,
        scheme,
        referer.as_deref(),
        &ctx.config,
        ctx.resolver.as_ref(),
        ctx.shortener.as_ref(),
    )
    .await?;

    ctx.store
        .write(job_id, &ProgressRecord::started(jobs.len() as u32))
        .await?;

    let worker_ctx = Arc::new(WorkerContext {
        backend: Arc::clone(&ctx.backend),
        store: ctx.store.clone(),
        cancel: ctx.cancel.clone(),
        lock: Arc::new(Mutex::new(())),
        print_temp_dir: ctx.config.print_temp_dir.clone(),
        file_prefix: ctx.config.file_prefix.clone(),
        log_spec_files: ctx.config.log_spec_files,
    });

    let mut outcomes = dispatch::dispatch_jobs(
        &jobs,
        &worker_ctx,
        ctx.config.pooled_dispatch,
        ctx.config.pool_size,
    )
    .await?;

    // Cancellation gate ahead of repair and merge; a cancelled run must not
    // turn its skipped workers into a retry failure.
    if ctx.cancel.is_cancelled(job_id).await {
        info!("[Job {}] Cancelled, skipping merge", job_id);
        return Ok(OrchestrationOutcome::Cancelled);
    }

    retry::retry_failed_jobs(&jobs, &mut outcomes, &worker_ctx).await?;

    let download_url =
        merge::merge_artifacts(job_id, scheme, outcomes, &ctx.config, &ctx.store).await?;

    Ok(OrchestrationOutcome::Completed { download_url })
}

/// Detaches one orchestration run and finalizes the progress record on
/// abort. The submitting request only ever waits for the spawn itself.
pub fn spawn_orchestration(
    ctx: Arc<ServiceContext>,
    spec: PrintSpec,
    scheme: String,
    referer: Option<String>,
    job_id: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match create_and_merge(&ctx, spec, &scheme, referer, &job_id).await {
            Ok(OrchestrationOutcome::Completed { download_url }) => {
                info!("[Job {}] Multiprint ready: {}", job_id, download_url);
            }
            Ok(OrchestrationOutcome::Cancelled) => {
                info!("[Job {}] Terminated after cancellation", job_id);
            }
            Err(err) => {
                error!(
                    "[Job {}] Orchestration aborted (code {}): {:?}",
                    job_id,
                    err.code(),
                    err
                );
                // Merge failures already deleted the info file; recreating
                // it would resurrect a record the cleanup just removed.
                if !matches!(err, OrchestrationError::MergeFailed(_)) {
                    let lock = Mutex::new(());
                    if let Err(err) = ctx.store.mark_failed(&job_id, &lock).await {
                        error!(
                            "[Job {}] Cannot finalize failed record: {:?}",
                            job_id, err
                        );
                    }
                }
            }
        }
    })
}
