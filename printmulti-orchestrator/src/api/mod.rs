//! API Module
//!
//! HTTP surface of the orchestrator. The submission path must return as
//! soon as the job id exists; everything else is a read of repository
//! state.

pub mod error;
pub mod health;
pub mod print;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::service::ServiceContext;

/// Create the main API router with all endpoints
pub fn create_router(ctx: Arc<ServiceContext>) -> Router {
    Router::new()
        // Health checks
        .route("/checker", get(health::checker))
        .route("/backend_checker", get(health::backend_checker))
        // Print lifecycle
        .route(
            "/printmulti/create.json",
            post(print::create_report).options(print::create_report_options),
        )
        .route("/printprogress", get(print::print_progress))
        .route("/printcancel", get(print::print_cancel))
        // Add state and middleware
        .with_state(ctx)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
