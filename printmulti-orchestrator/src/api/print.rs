//! Print API Handlers
//!
//! The submission, polling, and cancellation surface. Submission only
//! parses the spec, mints a job id, persists the initial record, and spawns
//! the orchestration; every failure after that is observable through the
//! progress record, never through this endpoint.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use printmulti_core::domain::progress::ProgressRecord;
use printmulti_core::domain::spec::PrintSpec;
use printmulti_core::dto::CreateReportResponse;
use rand::Rng;
use serde::Deserialize;
use tracing::{debug, error};

use crate::api::error::{ApiError, ApiResult};
use crate::repository::retention;
use crate::service::{ServiceContext, orchestrator};

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

/// POST /printmulti/create.json
/// Accepts a spec and kicks off the orchestration asynchronously
pub async fn create_report(
    State(ctx): State<Arc<ServiceContext>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<CreateReportResponse>> {
    let value: serde_json::Value = serde_json::from_slice(&body).map_err(|err| {
        error!("JSON content could not be parsed: {}", err);
        ApiError::BadRequest("JSON content could not be parsed".to_string())
    })?;
    if !value.is_object() {
        error!("Submitted spec is not a JSON object");
        return Err(ApiError::BadRequest(
            "JSON content could not be parsed".to_string(),
        ));
    }
    let spec = PrintSpec::new(value);

    if ctx.config.log_spec_files {
        debug!("spec: {}", spec.as_value());
    }

    debug!("Removing older files from {}", ctx.config.print_temp_dir.display());
    retention::sweep_old_files(&ctx.config.print_temp_dir, ctx.config.retention).await;

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http")
        .to_string();
    let referer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let job_id = new_job_id();
    ctx.store
        .write(&job_id, &ProgressRecord::ongoing())
        .await
        .map_err(|err| ApiError::Internal(format!("Cannot create info file: {:?}", err)))?;

    debug!("Starting multiprint {}", job_id);
    orchestrator::spawn_orchestration(Arc::clone(&ctx), spec, scheme, referer, job_id.clone());

    Ok(Json(CreateReportResponse { id_to_check: job_id }))
}

/// OPTIONS /printmulti/create.json
/// CORS preflight
pub async fn create_report_options() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /printprogress?id=<job id>
/// Current progress record; `written` reflects the merged file on disk
pub async fn print_progress(
    State(ctx): State<Arc<ServiceContext>>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Json<ProgressRecord>> {
    let id = require_id(query)?;

    if !ctx.store.exists(&id).await {
        return Err(ApiError::BadRequest(format!(
            "{} does not exist",
            ctx.store.info_path(&id).display()
        )));
    }

    let mut record = ctx.store.read(&id).await.map_err(|err| {
        error!("Error while reading progress for {}: {:?}", id, err);
        ApiError::Internal(format!("Cannot read/decode progress for {}", id))
    })?;

    if let Ok(metadata) = tokio::fs::metadata(ctx.config.merged_output_path(&id)).await {
        record.written = Some(metadata.len());
    }

    Ok(Json(record))
}

/// GET /printcancel?id=<job id>
/// Creates the cancellation marker
pub async fn print_cancel(
    State(ctx): State<Arc<ServiceContext>>,
    Query(query): Query<IdQuery>,
) -> ApiResult<StatusCode> {
    let id = require_id(query)?;

    ctx.cancel.request(&id).await.map_err(|err| {
        ApiError::Internal(format!("Could not create cancel marker for {}: {}", id, err))
    })?;

    Ok(StatusCode::OK)
}

fn require_id(query: IdQuery) -> Result<String, ApiError> {
    query
        .id
        .ok_or_else(|| ApiError::BadRequest("id query parameter is required".to_string()))
}

fn new_job_id() -> String {
    let stamp = chrono::Utc::now().format("%y%m%d%H%M%S");
    let suffix: u32 = rand::rng().random_range(1000..10000);
    format!("{}{}", stamp, suffix)
}
