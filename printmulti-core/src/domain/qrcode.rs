//! QR-code permalink rewriting
//!
//! A spec's `qrcodeurl` points at the QR generator service and embeds the
//! map permalink as its `url` query parameter. Each per-timestamp page gets
//! a permalink whose time parameters match the rendered timestamp, plus a
//! shortened link derived from it.

use url::Url;

/// Parsed `qrcodeurl`: the generator service URL and the embedded permalink.
#[derive(Debug, Clone)]
pub struct QrPermalink {
    service: Url,
    permalink: Url,
}

impl QrPermalink {
    /// Parses a `qrcodeurl`. Returns `None` when the value is not a URL or
    /// carries no embedded `url` parameter; callers print without a QR
    /// rewrite in that case.
    pub fn parse(qrcode_url: &str) -> Option<Self> {
        let service = Url::parse(qrcode_url).ok()?;
        let embedded = service
            .query_pairs()
            .find(|(key, _)| key == "url")
            .map(|(_, value)| value.into_owned())?;
        let permalink = Url::parse(&embedded).ok()?;
        Some(Self { service, permalink })
    }

    /// Rewrites the permalink's time parameters for one timestamp: `time`
    /// becomes the 4-char year, `layers_timestamp` the full timestamp.
    /// Parameters the permalink does not already carry are not introduced.
    pub fn set_timestamp(&mut self, timestamp: &str) {
        let year: String = timestamp.chars().take(4).collect();
        replace_query_param(&mut self.permalink, "time", &year);
        replace_query_param(&mut self.permalink, "layers_timestamp", timestamp);
    }

    /// The rewritten map permalink, the input to the URL shortener.
    pub fn permalink(&self) -> String {
        self.permalink.to_string()
    }

    /// Reassembles the full `qrcodeurl` with the rewritten permalink.
    pub fn qrcode_url(&self) -> String {
        let mut out = self.service.clone();
        let kept: Vec<(String, String)> = out
            .query_pairs()
            .filter(|(key, _)| key != "url")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        {
            let mut pairs = out.query_pairs_mut();
            pairs.clear();
            for (key, value) in &kept {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("url", self.permalink.as_str());
        }
        out.to_string()
    }
}

fn replace_query_param(url: &mut Url, key: &str, value: &str) {
    if !url.query_pairs().any(|(k, _)| k == key) {
        return;
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut rebuilt = url.query_pairs_mut();
    rebuilt.clear();
    for (k, v) in pairs {
        if k == key {
            rebuilt.append_pair(&k, value);
        } else {
            rebuilt.append_pair(&k, &v);
        }
    }
}
