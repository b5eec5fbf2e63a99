//! Print spec domain type
//!
//! The spec is client-submitted JSON whose exact shape belongs to the print
//! backend, so it is kept as a raw document and forwarded verbatim. The
//! helpers below cover the handful of fields the orchestration engine has to
//! read or rewrite before dispatch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mapping from timestamp to the indices of the layers it affects.
///
/// Iteration order of a `BTreeMap` is key-ascending, which for the
/// `yyyymmddHHMMSS`-style timestamp strings used here is time-ascending.
pub type TimestampPartition = BTreeMap<String, Vec<usize>>;

/// Client-submitted print job description.
///
/// Wraps the raw JSON document so unknown fields survive the round trip to
/// the backend renderer. Cloning produces the deep copy mutated per job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PrintSpec(Value);

impl PrintSpec {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    /// Whether the spec requests one page per timestamp.
    pub fn is_movie(&self) -> bool {
        self.0.get("movie").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn layer_count(&self) -> usize {
        self.layers().map(|l| l.len()).unwrap_or(0)
    }

    pub fn layers(&self) -> Option<&Vec<Value>> {
        self.0.get("layers").and_then(Value::as_array)
    }

    /// Sets the `TIME` parameter of one layer.
    ///
    /// Layers without a `params` object are left untouched; the backend
    /// renders them without a time dimension.
    pub fn set_layer_time(&mut self, index: usize, timestamp: &str) {
        if let Some(params) = self
            .0
            .get_mut("layers")
            .and_then(Value::as_array_mut)
            .and_then(|layers| layers.get_mut(index))
            .and_then(|layer| layer.get_mut("params"))
            .and_then(Value::as_object_mut)
        {
            params.insert("TIME".to_string(), Value::String(timestamp.to_string()));
        }
    }

    /// Percent-encodes `{` and `}` in every layer `baseURL`.
    ///
    /// WMTS template URLs carry literal braces that the backend's URL
    /// handling rejects unencoded.
    pub fn normalize_base_urls(&mut self) {
        let Some(layers) = self.0.get_mut("layers").and_then(Value::as_array_mut) else {
            return;
        };
        for layer in layers {
            if let Some(base_url) = layer.get("baseURL").and_then(Value::as_str) {
                let cleaned = base_url.replace('{', "%7B").replace('}', "%7D");
                layer["baseURL"] = Value::String(cleaned);
            }
        }
    }

    pub fn qrcode_url(&self) -> Option<&str> {
        self.0.get("qrcodeurl").and_then(Value::as_str)
    }

    pub fn set_qrcode_url(&mut self, url: &str) {
        if let Some(obj) = self.0.as_object_mut() {
            obj.insert("qrcodeurl".to_string(), Value::String(url.to_string()));
        }
    }

    /// Stamps the first page with the year of the rendered timestamp.
    pub fn set_page_timestamp(&mut self, timestamp: &str) {
        let year: String = timestamp.chars().take(4).collect();
        self.set_page_field("timestamp", Value::String(format!("{}\n", year)));
    }

    pub fn set_short_link(&mut self, link: &str) {
        self.set_page_field("shortLink", Value::String(link.to_string()));
    }

    fn set_page_field(&mut self, key: &str, value: Value) {
        if let Some(page) = self
            .0
            .get_mut("pages")
            .and_then(Value::as_array_mut)
            .and_then(|pages| pages.first_mut())
            .and_then(Value::as_object_mut)
        {
            page.insert(key.to_string(), value);
        }
    }

    /// Removes the legends block so it renders only on the page that keeps it.
    pub fn strip_legends(&mut self) {
        if let Some(obj) = self.0.as_object_mut() {
            if obj.remove("legends").is_some() {
                obj.insert("enableLegends".to_string(), Value::Bool(false));
            }
        }
    }

    /// Builds the timestamp partition from each layer's declared
    /// `timestamps` array.
    pub fn declared_timestamps(&self) -> TimestampPartition {
        let mut partition = TimestampPartition::new();
        let Some(layers) = self.layers() else {
            return partition;
        };
        for (index, layer) in layers.iter().enumerate() {
            let Some(timestamps) = layer.get("timestamps").and_then(Value::as_array) else {
                continue;
            };
            for ts in timestamps {
                if let Some(ts) = ts.as_str() {
                    partition.entry(ts.to_string()).or_default().push(index);
                }
            }
        }
        partition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn movie_spec() -> PrintSpec {
        PrintSpec::new(json!({
            "movie": true,
            "layers": [
                {"baseURL": "http://wmts/{z}/{x}/{y}.png", "params": {"LAYERS": "a"},
                 "timestamps": ["19991231", "20091231"]},
                {"params": {"LAYERS": "b"}, "timestamps": ["20091231"]},
                {"opacity": 0.5}
            ],
            "pages": [{"display": [800, 600]}],
            "legends": [{"name": "a"}],
            "qrcodeurl": "https://api.example.com/qrcodegenerator?url=https%3A%2F%2Fmap.example.com%2F%3Ftime%3D2009"
        }))
    }

    #[test]
    fn test_movie_flag() {
        assert!(movie_spec().is_movie());
        assert!(!PrintSpec::new(json!({"movie": false})).is_movie());
        assert!(!PrintSpec::new(json!({"layers": []})).is_movie());
    }

    #[test]
    fn test_set_layer_time() {
        let mut spec = movie_spec();
        spec.set_layer_time(0, "19991231");
        assert_eq!(
            spec.as_value()["layers"][0]["params"]["TIME"],
            json!("19991231")
        );

        // Layer without params stays untouched
        spec.set_layer_time(2, "19991231");
        assert!(spec.as_value()["layers"][2].get("params").is_none());

        // Out of range is a no-op
        spec.set_layer_time(17, "19991231");
    }

    #[test]
    fn test_normalize_base_urls() {
        let mut spec = movie_spec();
        spec.normalize_base_urls();
        assert_eq!(
            spec.as_value()["layers"][0]["baseURL"],
            json!("http://wmts/%7Bz%7D/%7Bx%7D/%7By%7D.png")
        );
        // Layers without a baseURL survive
        assert_eq!(spec.as_value()["layers"][1]["params"]["LAYERS"], json!("b"));
    }

    #[test]
    fn test_strip_legends() {
        let mut spec = movie_spec();
        spec.strip_legends();
        assert!(spec.as_value().get("legends").is_none());
        assert_eq!(spec.as_value()["enableLegends"], json!(false));

        // Without a legends block the flag is not written
        let mut bare = PrintSpec::new(json!({"layers": []}));
        bare.strip_legends();
        assert!(bare.as_value().get("enableLegends").is_none());
    }

    #[test]
    fn test_page_fields() {
        let mut spec = movie_spec();
        spec.set_page_timestamp("20091231");
        spec.set_short_link("https://s.example.com/abc");
        assert_eq!(spec.as_value()["pages"][0]["timestamp"], json!("2009\n"));
        assert_eq!(
            spec.as_value()["pages"][0]["shortLink"],
            json!("https://s.example.com/abc")
        );
    }

    #[test]
    fn test_declared_timestamps_ascending() {
        let partition = movie_spec().declared_timestamps();
        let keys: Vec<&String> = partition.keys().collect();
        assert_eq!(keys, ["19991231", "20091231"]);
        assert_eq!(partition["19991231"], vec![0]);
        assert_eq!(partition["20091231"], vec![0, 1]);
    }

    #[test]
    fn test_unknown_fields_survive() {
        let spec = PrintSpec::new(json!({"custom": {"nested": 1}, "movie": false}));
        let round_trip: PrintSpec =
            serde_json::from_str(&serde_json::to_string(&spec).unwrap()).unwrap();
        assert_eq!(round_trip, spec);
    }
}
