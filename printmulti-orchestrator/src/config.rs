//! Orchestrator configuration
//!
//! Defines all configurable parameters for the print orchestration service:
//! filesystem layout, backend connection settings, dispatch mode, and the
//! retention window for temporary artifacts.

use std::path::PathBuf;
use std::time::Duration;

/// Service configuration
///
/// Constructed once at startup and shared immutably; nothing reads the
/// environment after boot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP surface binds to
    pub bind_addr: String,

    /// Directory holding info files, cancel markers, and PDF artifacts.
    /// Shared with the backend renderer.
    pub print_temp_dir: PathBuf,

    /// Scheme-relative base URL of the print backend
    /// (e.g. "//print-backend:8009/service-print-main"); the scheme is taken
    /// from each submission's forwarded protocol.
    pub backend_server_url: String,

    /// Full URL of the backend's own liveness endpoint
    pub backend_checker_url: String,

    /// Public hostname the merged artifact is downloaded from; also sent as
    /// the Host header on every backend request.
    pub print_host: String,

    /// Base URL of the geodata API hosting the URL-shortening service
    pub api_url: String,

    /// Referer sent on backend liveness probes
    pub referer_url: String,

    /// Filename prefix of partial per-timestamp artifacts
    pub file_prefix: String,

    /// Filename prefix of the merged artifact, the info file, and the
    /// cancel marker
    pub multi_file_prefix: String,

    /// Whether backend TLS certificates are verified
    pub verify_tls: bool,

    /// Per-request timeout on backend create calls
    pub backend_timeout: Duration,

    /// Pooled (concurrent) vs sequential job dispatch
    pub pooled_dispatch: bool,

    /// Worker pool size in pooled mode
    pub pool_size: usize,

    /// Age after which temporary files are swept
    pub retention: Duration,

    /// Log every submitted spec at debug level
    pub log_spec_files: bool,

    /// External ordered PDF concatenation utility
    pub pdf_merge_command: PathBuf,
}

impl Config {
    /// Creates a configuration with defaults for everything but the backend
    /// location and public host
    pub fn new(backend_server_url: String, print_host: String) -> Self {
        let backend_checker_url = format!("http:{}/checker", backend_server_url);
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            print_temp_dir: PathBuf::from("/var/local/print"),
            backend_server_url,
            backend_checker_url,
            print_host,
            api_url: "https://api3.geo.admin.ch".to_string(),
            referer_url: "http://localhost".to_string(),
            file_prefix: "mapfish-print".to_string(),
            multi_file_prefix: "mapfish-multiprint".to_string(),
            verify_tls: true,
            backend_timeout: Duration::from_secs(600),
            pooled_dispatch: true,
            pool_size: num_cpus::get(),
            retention: Duration::from_secs(3600),
            log_spec_files: false,
            pdf_merge_command: PathBuf::from("/usr/bin/pdfunite"),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - PRINT_BACKEND_URL (required, scheme-relative)
    /// - PRINT_SERVER_HOST (required)
    /// - PRINT_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - PRINT_TEMP_DIR (optional, default: /var/local/print)
    /// - PRINT_BACKEND_CHECKER_URL (optional, default: http:<backend>/checker)
    /// - API_URL (optional, default: https://api3.geo.admin.ch)
    /// - REFERER_URL (optional, default: http://localhost)
    /// - VERIFY_SSL (optional, default: true)
    /// - PRINT_BACKEND_TIMEOUT (optional, seconds, default: 600)
    /// - POOLED_DISPATCH (optional, default: true)
    /// - POOL_SIZE (optional, default: host core count)
    /// - RETENTION_SECONDS (optional, default: 3600)
    /// - LOG_SPEC_FILES (optional, default: false)
    /// - PDF_MERGE_COMMAND (optional, default: /usr/bin/pdfunite)
    pub fn from_env() -> anyhow::Result<Self> {
        let backend_server_url = std::env::var("PRINT_BACKEND_URL")
            .map_err(|_| anyhow::anyhow!("PRINT_BACKEND_URL environment variable not set"))?;

        let print_host = std::env::var("PRINT_SERVER_HOST")
            .map_err(|_| anyhow::anyhow!("PRINT_SERVER_HOST environment variable not set"))?;

        let mut config = Self::new(backend_server_url, print_host);

        if let Ok(addr) = std::env::var("PRINT_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(dir) = std::env::var("PRINT_TEMP_DIR") {
            config.print_temp_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("PRINT_BACKEND_CHECKER_URL") {
            config.backend_checker_url = url;
        }
        if let Ok(url) = std::env::var("API_URL") {
            config.api_url = url;
        }
        if let Ok(url) = std::env::var("REFERER_URL") {
            config.referer_url = url;
        }
        if let Ok(value) = std::env::var("VERIFY_SSL") {
            config.verify_tls = parse_bool(&value);
        }
        if let Some(secs) = parse_env_u64("PRINT_BACKEND_TIMEOUT") {
            config.backend_timeout = Duration::from_secs(secs);
        }
        if let Ok(value) = std::env::var("POOLED_DISPATCH") {
            config.pooled_dispatch = parse_bool(&value);
        }
        if let Some(size) = parse_env_u64("POOL_SIZE") {
            config.pool_size = size as usize;
        }
        if let Some(secs) = parse_env_u64("RETENTION_SECONDS") {
            config.retention = Duration::from_secs(secs);
        }
        if let Ok(value) = std::env::var("LOG_SPEC_FILES") {
            config.log_spec_files = parse_bool(&value);
        }
        if let Ok(command) = std::env::var("PDF_MERGE_COMMAND") {
            config.pdf_merge_command = PathBuf::from(command);
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backend_server_url.is_empty() {
            anyhow::bail!("backend_server_url cannot be empty");
        }

        if !self.backend_server_url.starts_with("//") {
            anyhow::bail!("backend_server_url must be scheme-relative (start with //)");
        }

        if self.print_host.is_empty() {
            anyhow::bail!("print_host cannot be empty");
        }

        if self.pool_size == 0 {
            anyhow::bail!("pool_size must be greater than 0");
        }

        if self.backend_timeout.as_secs() == 0 {
            anyhow::bail!("backend_timeout must be greater than 0");
        }

        Ok(())
    }

    /// Path of the merged output artifact for one job id
    pub fn merged_output_path(&self, job_id: &str) -> PathBuf {
        self.print_temp_dir
            .join(format!("{}{}.pdf.printout", self.multi_file_prefix, job_id))
    }

    /// Public download URL of the merged artifact
    pub fn download_url(&self, scheme: &str, job_id: &str) -> String {
        format!(
            "{}://{}/{}{}.pdf.printout",
            scheme, self.print_host, self.multi_file_prefix, job_id
        )
    }

    /// Backend create URL for one submission; carries its own printout base
    /// as the `url` query parameter, as the backend expects.
    pub fn backend_create_url(&self, scheme: &str) -> String {
        let create_url = format!("{}:{}/print/create.json", scheme, self.backend_server_url);
        let encoded: String = url::form_urlencoded::byte_serialize(create_url.as_bytes()).collect();
        format!("{}?url={}", create_url, encoded)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.parse::<u64>().ok())
}
