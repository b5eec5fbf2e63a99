//! Retry coordinator
//!
//! After the main dispatch pass, every job whose artifact is absent gets
//! exactly one more worker invocation, synchronously, in job order. A second
//! failure aborts the whole orchestration; there is deliberately no backoff
//! and no retry count to tune at this layer.

use printmulti_core::domain::job::{PrintJob, RenderOutcome};
use tracing::{error, info, warn};

use crate::service::OrchestrationError;
use crate::service::worker::{self, WorkerContext};

/// Re-runs failed jobs once, replacing their outcome in place.
pub async fn retry_failed_jobs(
    jobs: &[PrintJob],
    outcomes: &mut [RenderOutcome],
    ctx: &WorkerContext,
) -> Result<(), OrchestrationError> {
    for (index, outcome) in outcomes.iter_mut().enumerate() {
        if !outcome.is_failure() {
            continue;
        }

        let job = &jobs[index];
        warn!(
            "[Job {}] Retrying failed PDF (timestamp={:?})",
            job.job_id, job.timestamp
        );

        let second = worker::run_job(job, ctx).await;
        if second.is_failure() {
            error!(
                "[Job {}] Retry for timestamp {:?} also failed",
                job.job_id, job.timestamp
            );
            error!("[Job {}] spec: {}", job.job_id, job.spec.as_value());
            return Err(OrchestrationError::RetryExhausted {
                index,
                timestamp: job.timestamp.clone(),
            });
        }

        info!(
            "[Job {}] Retried PDF for timestamp {:?} is OK",
            job.job_id, job.timestamp
        );
        *outcome = second;
    }

    Ok(())
}
