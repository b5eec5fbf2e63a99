//! Health Check API Handlers
//!
//! Liveness of the orchestrator itself and of the print backend behind it.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::api::error::{ApiError, ApiResult};
use crate::service::ServiceContext;

/// GET /checker
/// Health check endpoint
pub async fn checker() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /backend_checker
/// Proxies the print backend's own liveness endpoint
pub async fn backend_checker(State(ctx): State<Arc<ServiceContext>>) -> ApiResult<&'static str> {
    let body = ctx
        .backend
        .checker(&ctx.config.backend_checker_url, &ctx.config.referer_url)
        .await
        .map_err(|err| {
            if err.is_unavailable() {
                ApiError::BadGateway("Cannot connect to print backend".to_string())
            } else {
                ApiError::Unavailable(format!("Print backend is not ready: {}", err))
            }
        })?;

    if body.trim() == "OK" {
        Ok("OK")
    } else {
        Err(ApiError::Unavailable(
            "Incomprehensible answer, print backend is probably not ready yet".to_string(),
        ))
    }
}
