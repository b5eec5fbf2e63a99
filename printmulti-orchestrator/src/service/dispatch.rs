//! Job dispatcher
//!
//! Runs the partitioned jobs either through a bounded pool of concurrent
//! tasks or strictly sequentially. Both modes return one outcome per job in
//! partition order; pooled completion order never leaks into the result.

use std::sync::Arc;

use printmulti_core::domain::job::{PrintJob, RenderOutcome};
use tokio::sync::Semaphore;
use tracing::info;

use crate::service::OrchestrationError;
use crate::service::worker::{self, WorkerContext};

/// Dispatches all jobs and collects their outcomes positionally:
/// `outcomes[i]` belongs to `jobs[i]` regardless of completion order.
pub async fn dispatch_jobs(
    jobs: &[PrintJob],
    ctx: &Arc<WorkerContext>,
    pooled: bool,
    pool_size: usize,
) -> Result<Vec<RenderOutcome>, OrchestrationError> {
    if pooled {
        dispatch_pooled(jobs, ctx, pool_size).await
    } else {
        dispatch_sequential(jobs, ctx).await
    }
}

async fn dispatch_pooled(
    jobs: &[PrintJob],
    ctx: &Arc<WorkerContext>,
    pool_size: usize,
) -> Result<Vec<RenderOutcome>, OrchestrationError> {
    info!("Dispatching {} job(s) on a pool of {}", jobs.len(), pool_size);

    let semaphore = Arc::new(Semaphore::new(pool_size));

    let handles: Vec<_> = jobs
        .iter()
        .cloned()
        .map(|job| {
            let ctx = Arc::clone(ctx);
            let semaphore = Arc::clone(&semaphore);
            tokio::spawn(async move {
                let permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return RenderOutcome::failed(job.timestamp.clone()),
                };
                let outcome = worker::run_job(&job, &ctx).await;
                drop(permit);
                outcome
            })
        })
        .collect();

    // Awaiting in spawn order keeps results positional. A dead task is a
    // pool-level failure: outstanding tasks are torn down and the whole
    // orchestration aborts.
    let mut outcomes = Vec::with_capacity(handles.len());
    let mut failure = None;
    for handle in handles {
        if failure.is_some() {
            handle.abort();
            continue;
        }
        match handle.await {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => failure = Some(err),
        }
    }
    if let Some(err) = failure {
        return Err(OrchestrationError::Pool(err));
    }
    Ok(outcomes)
}

async fn dispatch_sequential(
    jobs: &[PrintJob],
    ctx: &Arc<WorkerContext>,
) -> Result<Vec<RenderOutcome>, OrchestrationError> {
    info!("Dispatching {} job(s) sequentially", jobs.len());

    let mut outcomes = Vec::with_capacity(jobs.len());
    for job in jobs {
        outcomes.push(worker::run_job(job, ctx).await);
    }
    Ok(outcomes)
}
