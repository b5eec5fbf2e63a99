//! Job partitioner
//!
//! Turns a submitted spec plus the resolved timestamp partition into the
//! ordered job list: one job per timestamp in movie mode, exactly one job
//! otherwise. Each job carries a deep copy of the spec rewritten for its
//! timestamp (TIME parameters, QR permalink, short link, legends).

use async_trait::async_trait;
use printmulti_client::UrlShortener;
use printmulti_core::domain::job::PrintJob;
use printmulti_core::domain::qrcode::QrPermalink;
use printmulti_core::domain::spec::{PrintSpec, TimestampPartition};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::service::OrchestrationError;

/// Boundary to the timestamp-resolution collaborator.
#[async_trait]
pub trait TimestampResolver: Send + Sync {
    /// Resolve the timestamp → affected-layer-indices mapping for one spec.
    async fn resolve(&self, spec: &PrintSpec, api_url: &str) -> TimestampPartition;
}

/// Default resolver: the partition is derived from the `timestamps` array
/// each layer declares.
pub struct LayerTimestampResolver;

#[async_trait]
impl TimestampResolver for LayerTimestampResolver {
    async fn resolve(&self, spec: &PrintSpec, _api_url: &str) -> TimestampPartition {
        spec.declared_timestamps()
    }
}

/// Builds the ordered job list for one submission.
pub async fn partition_jobs(
    spec: &PrintSpec,
    job_id: &str,
    scheme: &str,
    referer: Option<&str>,
    config: &Config,
    resolver: &dyn TimestampResolver,
    shortener: &dyn UrlShortener,
) -> Result<Vec<PrintJob>, OrchestrationError> {
    let mut base = spec.clone();
    base.normalize_base_urls();

    let backend_url = config.backend_create_url(scheme);

    if !base.is_movie() {
        return Ok(vec![PrintJob {
            index: 0,
            backend_url,
            referer: referer.map(str::to_string),
            timestamp: None,
            layers: Vec::new(),
            spec: base,
            job_id: job_id.to_string(),
        }]);
    }

    let partition = resolver.resolve(&base, &config.api_url).await;
    if partition.is_empty() {
        return Err(OrchestrationError::NoTimestamps);
    }
    info!(
        "[Job {}] {} timestamps to process: {:?}",
        job_id,
        partition.len(),
        partition.keys().collect::<Vec<_>>()
    );

    // Legends render once, on the final page
    let last_timestamp = partition.keys().next_back().cloned();

    let mut jobs = Vec::with_capacity(partition.len());
    for (index, (timestamp, layers)) in partition.iter().enumerate() {
        let mut page_spec = base.clone();
        for &layer in layers {
            page_spec.set_layer_time(layer, timestamp);
        }
        page_spec.set_page_timestamp(timestamp);

        rewrite_qrcode(&base, &mut page_spec, timestamp, job_id, shortener).await;

        if Some(timestamp) != last_timestamp.as_ref() {
            page_spec.strip_legends();
        }

        debug!(
            "[Job {}] Processed spec for timestamp {}",
            job_id, timestamp
        );

        jobs.push(PrintJob {
            index,
            backend_url: backend_url.clone(),
            referer: referer.map(str::to_string),
            timestamp: Some(timestamp.clone()),
            layers: layers.clone(),
            spec: page_spec,
            job_id: job_id.to_string(),
        });
    }

    Ok(jobs)
}

/// Adapts the QR-code URL and short link to the page's timestamp. A spec
/// without a parseable `qrcodeurl` prints without the rewrite.
async fn rewrite_qrcode(
    base: &PrintSpec,
    page_spec: &mut PrintSpec,
    timestamp: &str,
    job_id: &str,
    shortener: &dyn UrlShortener,
) {
    let Some(mut qr) = base.qrcode_url().and_then(QrPermalink::parse) else {
        debug!("[Job {}] No parseable qrcodeurl in spec", job_id);
        return;
    };

    qr.set_timestamp(timestamp);
    page_spec.set_qrcode_url(&qr.qrcode_url());

    let permalink = qr.permalink();
    let short_link = match shortener.shorten(&permalink).await {
        Ok(link) => link,
        Err(err) => {
            warn!(
                "[Job {}] Shortener failed for timestamp {}: {}",
                job_id, timestamp, err
            );
            permalink
        }
    };
    page_spec.set_short_link(&short_link);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use printmulti_client::error::Result as ClientResult;
    use serde_json::json;

    pub(crate) struct FixedShortener;

    #[async_trait]
    impl UrlShortener for FixedShortener {
        async fn shorten(&self, _url: &str) -> ClientResult<String> {
            Ok("https://s.example.com/abc".to_string())
        }
    }

    struct BrokenShortener;

    #[async_trait]
    impl UrlShortener for BrokenShortener {
        async fn shorten(&self, _url: &str) -> ClientResult<String> {
            Err(printmulti_client::ClientError::rejected(503, "down"))
        }
    }

    fn test_config() -> Config {
        Config::new(
            "//print-backend:8009/service-print-main".to_string(),
            "print.example.com".to_string(),
        )
    }

    fn movie_spec() -> PrintSpec {
        PrintSpec::new(json!({
            "movie": true,
            "layers": [
                {"baseURL": "http://wmts/{z}.png", "params": {}, "timestamps": ["19991231", "20091231", "20121231"]},
                {"params": {}, "timestamps": ["20121231"]}
            ],
            "pages": [{"display": [800, 600]}],
            "legends": [{"name": "a"}],
            "qrcodeurl": "https://api.example.com/qrcodegenerator?url=https%3A%2F%2Fmap.example.com%2F%3Ftime%3D2012%26layers_timestamp%3D20121231"
        }))
    }

    #[tokio::test]
    async fn test_single_job_without_movie() {
        let spec = PrintSpec::new(json!({"movie": false, "layers": [{"baseURL": "http://w/{z}"}]}));
        let jobs = partition_jobs(
            &spec,
            "240805",
            "https",
            Some("https://map.example.com"),
            &test_config(),
            &LayerTimestampResolver,
            &FixedShortener,
        )
        .await
        .unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].timestamp, None);
        assert!(jobs[0].layers.is_empty());
        assert_eq!(jobs[0].spec.as_value()["layers"][0]["baseURL"], json!("http://w/%7Bz%7D"));
        assert_eq!(jobs[0].referer.as_deref(), Some("https://map.example.com"));
    }

    #[tokio::test]
    async fn test_one_job_per_timestamp_in_order() {
        let jobs = partition_jobs(
            &movie_spec(),
            "240805",
            "https",
            None,
            &test_config(),
            &LayerTimestampResolver,
            &FixedShortener,
        )
        .await
        .unwrap();

        let timestamps: Vec<&str> = jobs.iter().filter_map(|j| j.timestamp.as_deref()).collect();
        assert_eq!(timestamps, ["19991231", "20091231", "20121231"]);
        assert_eq!(jobs[0].index, 0);
        assert_eq!(jobs[2].index, 2);
        assert_eq!(jobs[2].layers, vec![0, 1]);

        // TIME lands only on the affected layers of each copy
        assert_eq!(
            jobs[0].spec.as_value()["layers"][0]["params"]["TIME"],
            json!("19991231")
        );
        assert!(jobs[0].spec.as_value()["layers"][1]["params"].get("TIME").is_none());
    }

    #[tokio::test]
    async fn test_legends_survive_only_on_last_page() {
        let jobs = partition_jobs(
            &movie_spec(),
            "240805",
            "https",
            None,
            &test_config(),
            &LayerTimestampResolver,
            &FixedShortener,
        )
        .await
        .unwrap();

        assert!(jobs[0].spec.as_value().get("legends").is_none());
        assert_eq!(jobs[0].spec.as_value()["enableLegends"], json!(false));
        assert!(jobs[1].spec.as_value().get("legends").is_none());
        assert!(jobs[2].spec.as_value().get("legends").is_some());
    }

    #[tokio::test]
    async fn test_qrcode_and_short_link_rewritten_per_page() {
        let jobs = partition_jobs(
            &movie_spec(),
            "240805",
            "https",
            None,
            &test_config(),
            &LayerTimestampResolver,
            &FixedShortener,
        )
        .await
        .unwrap();

        let qrcodeurl = jobs[0].spec.qrcode_url().unwrap();
        assert!(qrcodeurl.contains("layers_timestamp%3D19991231"));
        assert_eq!(
            jobs[0].spec.as_value()["pages"][0]["shortLink"],
            json!("https://s.example.com/abc")
        );
        assert_eq!(
            jobs[0].spec.as_value()["pages"][0]["timestamp"],
            json!("1999\n")
        );
    }

    #[tokio::test]
    async fn test_shortener_failure_falls_back_to_permalink() {
        let jobs = partition_jobs(
            &movie_spec(),
            "240805",
            "https",
            None,
            &test_config(),
            &LayerTimestampResolver,
            &BrokenShortener,
        )
        .await
        .unwrap();

        let link = jobs[0].spec.as_value()["pages"][0]["shortLink"]
            .as_str()
            .unwrap();
        assert!(link.starts_with("https://map.example.com/"));
    }

    #[tokio::test]
    async fn test_spec_without_qrcode_partitions_cleanly() {
        let spec = PrintSpec::new(json!({
            "movie": true,
            "layers": [{"params": {}, "timestamps": ["19991231"]}],
            "pages": [{}]
        }));
        let jobs = partition_jobs(
            &spec,
            "240805",
            "http",
            None,
            &test_config(),
            &LayerTimestampResolver,
            &FixedShortener,
        )
        .await
        .unwrap();
        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].spec.as_value()["pages"][0].get("shortLink").is_none());
    }

    #[tokio::test]
    async fn test_movie_without_timestamps_fails() {
        let spec = PrintSpec::new(json!({"movie": true, "layers": [{"params": {}}]}));
        let err = partition_jobs(
            &spec,
            "240805",
            "http",
            None,
            &test_config(),
            &LayerTimestampResolver,
            &FixedShortener,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OrchestrationError::NoTimestamps));
        assert_eq!(err.code(), 4);
    }
}
