//! Wire DTOs
//!
//! Types exchanged with submitting clients and with the external
//! collaborators (backend renderer, URL shortener). Field casing follows the
//! established wire contract.

use serde::{Deserialize, Serialize};

/// Response to `POST /printmulti/create.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReportResponse {
    #[serde(rename = "idToCheck")]
    pub id_to_check: String,
}

/// Successful reply from the backend renderer's create endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendCreated {
    /// Reference to the rendered file; only its basename is meaningful to
    /// the orchestrator (the artifact is reachable on the shared volume).
    #[serde(rename = "getURL")]
    pub get_url: String,
}

/// Reply from the URL-shortening service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortenResponse {
    pub shorturl: String,
}
