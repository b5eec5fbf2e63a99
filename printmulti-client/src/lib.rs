//! Printmulti HTTP clients
//!
//! Typed clients for the external collaborators of the print orchestration
//! engine: the MapFish-style print backend (one create call per partial PDF
//! plus a liveness probe) and the URL-shortening service.
//!
//! The orchestration engine depends on the [`RenderBackend`] and
//! [`UrlShortener`] traits rather than on these concrete clients, so tests
//! substitute in-memory fakes.
//!
//! # Example
//!
//! ```no_run
//! use printmulti_client::PrintBackendClient;
//! use std::time::Duration;
//!
//! # fn main() -> anyhow::Result<()> {
//! let http = reqwest::Client::builder()
//!     .timeout(Duration::from_secs(120))
//!     .danger_accept_invalid_certs(true)
//!     .build()?;
//! let backend = PrintBackendClient::with_client("print.example.com", http);
//! # let _ = backend;
//! # Ok(())
//! # }
//! ```

pub mod error;
mod shortener;

pub use error::{ClientError, Result};
pub use shortener::{HttpUrlShortener, UrlShortener};

use async_trait::async_trait;
use printmulti_core::domain::spec::PrintSpec;
use printmulti_core::dto::BackendCreated;
use reqwest::Client;
use reqwest::header::{HOST, REFERER};

/// Boundary to the remote print backend.
///
/// One call per partition job; the orchestration engine never retries at
/// this layer.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Submit one rewritten spec for rendering and return the backend's
    /// reference to the produced file.
    async fn create_print(
        &self,
        url: &str,
        spec: &PrintSpec,
        referer: Option<&str>,
    ) -> Result<BackendCreated>;

    /// Probe the backend's own liveness endpoint and return its raw body.
    async fn checker(&self, url: &str, referer: &str) -> Result<String>;
}

/// HTTP client for the print backend
///
/// Timeouts and TLS verification are properties of the `reqwest::Client`
/// handed in by the caller; this type only owns the request shape.
#[derive(Debug, Clone)]
pub struct PrintBackendClient {
    /// Host header sent with every request; the backend sits behind a
    /// shared frontend and routes on it.
    host: String,
    /// HTTP client instance
    client: Client,
}

impl PrintBackendClient {
    /// Create a new backend client with a default HTTP client
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_client(host, Client::new())
    }

    /// Create a new backend client with a custom HTTP client
    ///
    /// Use this to configure the request timeout and TLS verification.
    pub fn with_client(host: impl Into<String>, client: Client) -> Self {
        Self {
            host: host.into(),
            client,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl RenderBackend for PrintBackendClient {
    async fn create_print(
        &self,
        url: &str,
        spec: &PrintSpec,
        referer: Option<&str>,
    ) -> Result<BackendCreated> {
        tracing::debug!("Sending create request to {}", url);

        let mut request = self
            .client
            .post(url)
            .header(HOST, &self.host)
            .json(spec.as_value());
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::rejected(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("invalid create response: {}", e)))
    }

    async fn checker(&self, url: &str, referer: &str) -> Result<String> {
        let response = self.client.get(url).header(REFERER, referer).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::rejected(status.as_u16(), body));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = PrintBackendClient::new("print.example.com");
        assert_eq!(client.host(), "print.example.com");
    }

    #[test]
    fn test_client_with_custom_client() {
        let http = Client::new();
        let client = PrintBackendClient::with_client("print.example.com", http);
        assert_eq!(client.host(), "print.example.com");
    }
}
