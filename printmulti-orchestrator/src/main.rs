//! Printmulti Orchestrator
//!
//! Print proxy in front of a MapFish-style print backend that deals with
//! time series: when a spec requests one page per timestamp, the
//! orchestrator partitions it into per-timestamp jobs, dispatches them to
//! the backend, retries failures once, and merges the partial PDFs into one
//! document clients poll for.
//!
//! Architecture:
//! - Configuration: immutable settings loaded once from the environment
//! - Repository: file-backed progress records and cancellation markers
//! - Service: partition, dispatch, retry, and merge logic
//! - API: the thin axum surface (submit, poll, cancel, health)

pub mod api;
pub mod config;
pub mod repository;
pub mod service;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::repository::{CancelSignal, ProgressStore};
use crate::service::{LayerTimestampResolver, ServiceContext};
use printmulti_client::{HttpUrlShortener, PrintBackendClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "printmulti_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting printmulti orchestrator");

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;
    info!(
        "Loaded configuration: backend={}, host={}, temp dir={}",
        config.backend_server_url,
        config.print_host,
        config.print_temp_dir.display()
    );

    tokio::fs::create_dir_all(&config.print_temp_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create temp directory {}",
                config.print_temp_dir.display()
            )
        })?;

    // Backend client carries the request timeout and TLS settings
    let http = reqwest::Client::builder()
        .timeout(config.backend_timeout)
        .danger_accept_invalid_certs(!config.verify_tls)
        .build()
        .context("Failed to build HTTP client")?;
    let backend = PrintBackendClient::with_client(config.print_host.clone(), http.clone());
    let shortener =
        HttpUrlShortener::with_client(format!("{}/shorten.json", config.api_url), http);

    let store = ProgressStore::new(&config.print_temp_dir, &config.multi_file_prefix);
    let cancel = CancelSignal::new(&config.print_temp_dir, &config.multi_file_prefix);

    let bind_addr = config.bind_addr.clone();
    let ctx = Arc::new(ServiceContext {
        config,
        store,
        cancel,
        backend: Arc::new(backend),
        shortener: Arc::new(shortener),
        resolver: Arc::new(LayerTimestampResolver),
    });

    // Build router with all API endpoints
    let app = api::create_router(ctx);

    info!("Listening on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
