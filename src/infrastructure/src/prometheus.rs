use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::Value;
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

#[derive(Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<RawSample>,
}

#[derive(Deserialize)]
struct RawSample {
    #[serde(default)]
    metric: HashMap<String, String>,
    #[serde(default)]
    value: Option<(Value, String)>,
}

/// One instant-vector sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: HashMap<String, String>,
    pub value: f64,
}

impl Sample {
    pub fn label(&self, name: &str) -> &str {
        self.metric.get(name).map(String::as_str).unwrap_or("unknown")
    }
}

#[derive(Clone)]
pub struct PrometheusClient {
    client: Arc<Client>,
    base_url: String,
}

impl PrometheusClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Status code of `/-/healthy`.
    pub async fn health(&self) -> Result<u16> {
        let url = format!("{}/-/healthy", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().as_u16())
    }

    /// Instant query; samples whose value cannot be parsed are skipped.
    pub async fn query(&self, promql: &str) -> Result<Vec<Sample>> {
        let url = format!("{}/api/v1/query", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("query", promql.trim())])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!(status = %status, "Prometheus query failed");
            return Err(Error::Network(format!("Prometheus returned {}: {}", status, text)));
        }
        parse_query_response(&text)
    }
}

pub fn parse_query_response(body: &str) -> Result<Vec<Sample>> {
    let parsed: QueryResponse = serde_json::from_str(body)?;
    if parsed.status != "success" {
        return Err(Error::Network(
            parsed.error.unwrap_or_else(|| "Prometheus query failed".to_string()),
        ));
    }
    let samples = parsed
        .data
        .map(|d| d.result)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| {
            let (_, value) = raw.value?;
            Some(Sample {
                metric: raw.metric,
                value: value.parse().ok()?,
            })
        })
        .collect();
    Ok(samples)
}

/// Human-readable byte count, base 1024.
pub fn format_bytes(bytes: f64) -> String {
    let mut value = bytes;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if value < 1024.0 {
            return format!("{:.1} {}", value, unit);
        }
        value /= 1024.0;
    }
    format!("{:.1} PB", value)
}
