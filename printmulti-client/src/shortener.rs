//! URL shortener client

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{ClientError, Result};
use printmulti_core::dto::ShortenResponse;

/// Boundary to the URL-shortening service.
#[async_trait]
pub trait UrlShortener: Send + Sync {
    /// Shorten one permalink, returning the short link string.
    async fn shorten(&self, url: &str) -> Result<String>;
}

/// HTTP client for the shortening service
#[derive(Debug, Clone)]
pub struct HttpUrlShortener {
    /// Shortener endpoint, e.g. `https://api.example.com/shorten.json`
    endpoint: String,
    client: Client,
}

impl HttpUrlShortener {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(endpoint, Client::new())
    }

    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl UrlShortener for HttpUrlShortener {
    async fn shorten(&self, url: &str) -> Result<String> {
        tracing::debug!("Shortening {}", url);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", url)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::rejected(status.as_u16(), body));
        }

        let reply: ShortenResponse = response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("invalid shortener response: {}", e)))?;
        Ok(reply.shorturl)
    }
}
