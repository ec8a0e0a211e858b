use super::{int_arg, required_str, str_arg};
use crate::prometheus::{format_bytes, PrometheusClient, Sample};
use async_trait::async_trait;
use domain::models::ToolParameters;
use domain::services::{Capability, CapabilitySource};
use regex::Regex;
use serde_json::{json, Value};
use shared::types::JsonMap;
use std::sync::OnceLock;
use tracing::warn;

static RANGE: OnceLock<Regex> = OnceLock::new();

/// Model-supplied text placed inside a double-quoted PromQL label matcher.
fn label_value(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Range selectors accept a bare duration such as `5m` or `1h`.
fn is_range(raw: &str) -> bool {
    RANGE
        .get_or_init(|| Regex::new(r"^[0-9]+(ms|[smhdwy])$").expect("valid range pattern"))
        .is_match(raw)
}

fn text(message: String) -> anyhow::Result<Value> {
    Ok(json!({ "output": message }))
}

/// Samples of a query, or nothing when Prometheus cannot answer.
async fn samples(client: &PrometheusClient, promql: &str) -> Vec<Sample> {
    match client.query(promql).await {
        Ok(samples) => samples,
        Err(e) => {
            warn!(error = %e, "Prometheus query failed");
            Vec::new()
        }
    }
}

async fn first_value(client: &PrometheusClient, promql: &str) -> Option<f64> {
    samples(client, promql).await.first().map(|s| s.value)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Resource {
    Cpu,
    Memory,
}

impl Resource {
    fn parse(value: Option<&str>) -> Option<Self> {
        match value.unwrap_or("memory").to_lowercase().as_str() {
            "memory" => Some(Resource::Memory),
            "cpu" => Some(Resource::Cpu),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Resource::Cpu => "CPU",
            Resource::Memory => "Memory",
        }
    }
}

pub struct PrometheusSource {
    client: PrometheusClient,
}

impl PrometheusSource {
    pub fn new(client: PrometheusClient) -> Self {
        Self { client }
    }
}

impl CapabilitySource for PrometheusSource {
    fn source_name(&self) -> &str {
        "prometheus"
    }

    fn capabilities(&self) -> Vec<Box<dyn Capability>> {
        let c = &self.client;
        vec![
            Box::new(CheckPrometheusHealth(c.clone())),
            Box::new(GetResourceUsage(c.clone())),
            Box::new(GetTopPodsByResource(c.clone())),
            Box::new(CheckPodRestarts(c.clone())),
            Box::new(GetNamespaceMetrics(c.clone())),
            Box::new(CheckNodeHealth(c.clone())),
            Box::new(GetServiceResponseTime(c.clone())),
            Box::new(GetErrorRate(c.clone())),
        ]
    }
}

pub struct CheckPrometheusHealth(PrometheusClient);

#[async_trait]
impl Capability for CheckPrometheusHealth {
    fn name(&self) -> &str {
        "check_prometheus_health"
    }

    fn description(&self) -> &str {
        "Check if Prometheus is healthy and responding"
    }

    async fn invoke(&self, _args: JsonMap) -> anyhow::Result<Value> {
        let status = match self.0.health().await {
            Ok(status) => status,
            Err(_) => {
                return text("❌ Cannot connect to Prometheus. Please check if it's running.".into())
            }
        };
        if status != 200 {
            return text(format!("⚠️ Prometheus returned status code: {}", status));
        }
        let build = samples(&self.0, "prometheus_build_info").await;
        match build.first() {
            Some(sample) => text(format!(
                "✅ Prometheus is healthy! Version: {}",
                sample.label("version")
            )),
            None => text("✅ Prometheus is healthy and responding!".into()),
        }
    }
}

pub struct GetResourceUsage(PrometheusClient);

#[async_trait]
impl Capability for GetResourceUsage {
    fn name(&self) -> &str {
        "get_resource_usage"
    }

    fn description(&self) -> &str {
        "Get current cluster resource usage for cpu or memory"
    }

    fn parameters(&self) -> ToolParameters {
        ToolParameters::empty().one_of("resource_type", "cpu or memory", &["cpu", "memory"])
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        let raw = str_arg(&args, "resource_type");
        let Some(resource) = Resource::parse(raw) else {
            return text(format!(
                "❌ Unknown resource type: {}. Use 'cpu' or 'memory'.",
                raw.unwrap_or_default()
            ));
        };
        let query = match resource {
            Resource::Memory => {
                "(1 - (sum(node_memory_MemAvailable_bytes) / sum(node_memory_MemTotal_bytes))) * 100"
            }
            Resource::Cpu => r#"(1 - avg(rate(node_cpu_seconds_total{mode="idle"}[5m]))) * 100"#,
        };
        match first_value(&self.0, query).await {
            Some(value) => text(format!(
                "📊 Cluster {} Usage: {:.1}%",
                resource.label(),
                value
            )),
            None => text(format!(
                "❌ No {} usage data available",
                resource.label().to_lowercase()
            )),
        }
    }
}

pub struct GetTopPodsByResource(PrometheusClient);

#[async_trait]
impl Capability for GetTopPodsByResource {
    fn name(&self) -> &str {
        "get_top_pods_by_resource"
    }

    fn description(&self) -> &str {
        "Get the pods consuming the most cpu or memory"
    }

    fn parameters(&self) -> ToolParameters {
        ToolParameters::empty()
            .optional("resource", "string", "cpu or memory (default: memory)")
            .optional("limit", "integer", "How many pods to list (default: 5)")
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        let raw = str_arg(&args, "resource");
        let Some(resource) = Resource::parse(raw) else {
            return text(format!(
                "❌ Unknown resource: {}. Use 'cpu' or 'memory'.",
                raw.unwrap_or_default()
            ));
        };
        let limit = int_arg(&args, "limit").filter(|n| *n > 0).unwrap_or(5);
        let query = match resource {
            Resource::Memory => format!(
                r#"topk({}, sum(container_memory_working_set_bytes{{pod!=""}}) by (namespace, pod))"#,
                limit
            ),
            Resource::Cpu => format!(
                r#"topk({}, sum(rate(container_cpu_usage_seconds_total{{pod!=""}}[5m])) by (namespace, pod))"#,
                limit
            ),
        };

        let rows = samples(&self.0, &query).await;
        if rows.is_empty() {
            return text(format!(
                "❌ No {} usage data available",
                resource.label().to_lowercase()
            ));
        }

        let mut lines = vec![
            format!("🏆 Top {} Pods by {} Usage:", limit, resource.label()),
            String::new(),
        ];
        for (i, row) in rows.iter().enumerate() {
            let value = match resource {
                Resource::Memory => format_bytes(row.value),
                Resource::Cpu => format!("{:.3} cores", row.value),
            };
            lines.push(format!(
                "{}. {}/{}: {}",
                i + 1,
                row.label("namespace"),
                row.label("pod"),
                value
            ));
        }
        text(lines.join("\n"))
    }
}

pub struct CheckPodRestarts(PrometheusClient);

#[async_trait]
impl Capability for CheckPodRestarts {
    fn name(&self) -> &str {
        "check_pod_restarts"
    }

    fn description(&self) -> &str {
        "Check for pods with high restart counts"
    }

    fn parameters(&self) -> ToolParameters {
        ToolParameters::empty()
            .optional("namespace", "string", "Namespace, or 'all' (default: all)")
            .optional("threshold", "integer", "Minimum restart count (default: 5)")
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        let namespace = str_arg(&args, "namespace").unwrap_or("all");
        let threshold = int_arg(&args, "threshold").unwrap_or(5);
        let rows = samples(&self.0, &restarts_query(namespace, threshold)).await;
        if rows.is_empty() {
            return text(format!(
                "✅ No pods with more than {} restarts found",
                threshold
            ));
        }
        let mut lines = vec![
            format!("⚠️ Pods with more than {} restarts:", threshold),
            String::new(),
        ];
        for row in &rows {
            lines.push(format!(
                "• {}/{} ({}): {} restarts",
                row.label("namespace"),
                row.label("pod"),
                row.label("container"),
                row.value as i64
            ));
        }
        text(lines.join("\n"))
    }
}

pub struct GetNamespaceMetrics(PrometheusClient);

#[async_trait]
impl Capability for GetNamespaceMetrics {
    fn name(&self) -> &str {
        "get_namespace_metrics"
    }

    fn description(&self) -> &str {
        "Get a resource usage summary (cpu, memory, pods, containers) for a namespace"
    }

    fn parameters(&self) -> ToolParameters {
        ToolParameters::empty().optional("namespace", "string", "Namespace (default: default)")
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        let ns = str_arg(&args, "namespace").unwrap_or("default");
        let matcher = label_value(ns);
        let mut lines = vec![format!("📊 Namespace Metrics: {}", ns), String::new()];

        let cpu = format!(
            r#"sum(rate(container_cpu_usage_seconds_total{{namespace="{}"}}[5m]))"#,
            matcher
        );
        if let Some(cores) = first_value(&self.0, &cpu).await {
            lines.push(format!("CPU: {:.3} cores", cores));
        }
        let memory = format!(
            r#"sum(container_memory_working_set_bytes{{namespace="{}"}})"#,
            matcher
        );
        if let Some(bytes) = first_value(&self.0, &memory).await {
            lines.push(format!("Memory: {}", format_bytes(bytes)));
        }
        let pods = format!(r#"count(kube_pod_info{{namespace="{}"}})"#, matcher);
        if let Some(count) = first_value(&self.0, &pods).await {
            lines.push(format!("Pods: {}", count as i64));
        }
        let containers = format!(r#"count(kube_pod_container_info{{namespace="{}"}})"#, matcher);
        if let Some(count) = first_value(&self.0, &containers).await {
            lines.push(format!("Containers: {}", count as i64));
        }

        if lines.len() == 2 {
            return text(format!("❌ No metrics available for namespace: {}", ns));
        }
        text(lines.join("\n"))
    }
}

pub struct CheckNodeHealth(PrometheusClient);

#[async_trait]
impl Capability for CheckNodeHealth {
    fn name(&self) -> &str {
        "check_node_health"
    }

    fn description(&self) -> &str {
        "Check for nodes under memory or disk pressure, or not ready"
    }

    async fn invoke(&self, _args: JsonMap) -> anyhow::Result<Value> {
        let checks = [
            ("Memory Pressure:", r#"kube_node_status_condition{condition="MemoryPressure", status="true"} == 1"#),
            ("Disk Pressure:", r#"kube_node_status_condition{condition="DiskPressure", status="true"} == 1"#),
            ("Not Ready:", r#"kube_node_status_condition{condition="Ready", status="false"} == 1"#),
        ];

        let mut lines = Vec::new();
        for (heading, query) in checks {
            let rows = samples(&self.0, query).await;
            if rows.is_empty() {
                continue;
            }
            if lines.is_empty() {
                lines.push("⚠️ Node Health Issues:".to_string());
                lines.push(String::new());
            }
            lines.push(heading.to_string());
            for row in &rows {
                lines.push(format!("  • {}", row.label("node")));
            }
        }

        if !lines.is_empty() {
            return text(lines.join("\n"));
        }
        match first_value(&self.0, "count(kube_node_info)").await {
            Some(count) => text(format!("✅ All {} nodes are healthy!", count as i64)),
            None => text("✅ All nodes appear healthy!".into()),
        }
    }
}

pub struct GetServiceResponseTime(PrometheusClient);

#[async_trait]
impl Capability for GetServiceResponseTime {
    fn name(&self) -> &str {
        "get_service_response_time"
    }

    fn description(&self) -> &str {
        "Get a latency percentile for a service exporting http request duration histograms"
    }

    fn parameters(&self) -> ToolParameters {
        ToolParameters::empty()
            .required("service_name", "string", "Service label value")
            .optional("percentile", "integer", "Percentile, e.g. 95 (default: 95)")
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        let service = required_str(&args, "service_name")?;
        let percentile = int_arg(&args, "percentile")
            .filter(|p| (1..=100).contains(p))
            .unwrap_or(95);
        let quantile = percentile as f64 / 100.0;
        let matcher = label_value(service);

        for metric in [
            "http_request_duration_seconds_bucket",
            "http_server_request_duration_seconds_bucket",
        ] {
            let query = format!(
                r#"histogram_quantile({}, sum(rate({}{{service="{}"}}[5m])) by (le))"#,
                quantile, metric, matcher
            );
            if let Some(seconds) = first_value(&self.0, &query).await {
                return text(format!(
                    "📈 {} p{} response time: {:.1}ms",
                    service,
                    percentile,
                    seconds * 1000.0
                ));
            }
        }
        text(format!(
            "❌ No response time metrics available for service: {}",
            service
        ))
    }
}

pub struct GetErrorRate(PrometheusClient);

#[async_trait]
impl Capability for GetErrorRate {
    fn name(&self) -> &str {
        "get_error_rate"
    }

    fn description(&self) -> &str {
        "Get the 5xx error rate for a service or the whole cluster"
    }

    fn parameters(&self) -> ToolParameters {
        ToolParameters::empty()
            .optional("service_name", "string", "Service label value (default: cluster-wide)")
            .optional("time_range", "string", "Rate window, e.g. 5m (default: 5m)")
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        let range = str_arg(&args, "time_range").unwrap_or("5m");
        if !is_range(range) {
            return text(format!(
                "❌ Invalid time range: {}. Use a duration such as 5m, 1h or 7d.",
                range
            ));
        }
        let service = str_arg(&args, "service_name");
        let query = error_rate_query(service, range);
        let scope = match service {
            Some(svc) => format!("service '{}'", svc),
            None => "cluster-wide".to_string(),
        };

        match first_value(&self.0, &query).await {
            Some(rate) => text(format!(
                "{} Error rate ({}): {:.2}% over {}",
                error_rate_marker(rate),
                scope,
                rate,
                range
            )),
            None => text(format!("❌ No error rate data available for {}", scope)),
        }
    }
}

fn restarts_query(namespace: &str, threshold: i64) -> String {
    if namespace == "all" {
        format!("kube_pod_container_status_restarts_total > {}", threshold)
    } else {
        format!(
            r#"kube_pod_container_status_restarts_total{{namespace="{}"}} > {}"#,
            label_value(namespace),
            threshold
        )
    }
}

/// `range` must already satisfy [`is_range`].
fn error_rate_query(service: Option<&str>, range: &str) -> String {
    match service {
        Some(svc) => format!(
            r#"sum(rate(http_requests_total{{service="{svc}", status=~"5.."}}[{range}])) / sum(rate(http_requests_total{{service="{svc}"}}[{range}])) * 100"#,
            svc = label_value(svc),
            range = range
        ),
        None => format!(
            r#"sum(rate(http_requests_total{{status=~"5.."}}[{range}])) / sum(rate(http_requests_total[{range}])) * 100"#,
            range = range
        ),
    }
}

fn error_rate_marker(rate: f64) -> &'static str {
    if rate > 5.0 {
        "🔴"
    } else if rate > 1.0 {
        "🟡"
    } else {
        "🟢"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_parsing() {
        assert!(Resource::parse(None) == Some(Resource::Memory));
        assert!(Resource::parse(Some("CPU")) == Some(Resource::Cpu));
        assert!(Resource::parse(Some("disk")).is_none());
    }

    #[test]
    fn test_label_values_cannot_close_the_matcher() {
        assert_eq!(label_value("prod"), "prod");
        assert_eq!(
            label_value(r#"x"} or vector(1) or {a="\"#),
            r#"x\"} or vector(1) or {a=\"\\"#
        );
        assert_eq!(
            restarts_query(r#"prod"} or up{job=""#, 5),
            r#"kube_pod_container_status_restarts_total{namespace="prod\"} or up{job=\""} > 5"#
        );
        assert_eq!(restarts_query("all", 3), "kube_pod_container_status_restarts_total > 3");
    }

    #[test]
    fn test_error_rate_query_escapes_service() {
        let query = error_rate_query(Some(r#"api"} or vector(100) #"#), "5m");
        assert!(query.contains(r#"service="api\"} or vector(100) #""#));
        assert!(!query.contains(r#"service="api"}"#));
        assert_eq!(
            error_rate_query(None, "1h"),
            r#"sum(rate(http_requests_total{status=~"5.."}[1h])) / sum(rate(http_requests_total[1h])) * 100"#
        );
    }

    #[test]
    fn test_range_shapes() {
        for ok in ["5m", "30s", "1h", "7d", "2w", "1y", "500ms"] {
            assert!(is_range(ok), "{}", ok);
        }
        for bad in ["", "5", "m", "5m]) or vector(1", "1h30m", "-5m", "5 m"] {
            assert!(!is_range(bad), "{}", bad);
        }
    }

    #[tokio::test]
    async fn test_bad_time_range_is_refused_before_querying() {
        let client = PrometheusClient::new("http://127.0.0.1:9").unwrap();
        let args = domain::models::normalize_arguments(
            json!({"service_name": "api", "time_range": "5m])) or vector(1"}),
        );
        let value = GetErrorRate(client).invoke(args).await.unwrap();
        assert_eq!(
            value["output"],
            "❌ Invalid time range: 5m])) or vector(1. Use a duration such as 5m, 1h or 7d."
        );
    }

    #[test]
    fn test_error_rate_marker() {
        assert_eq!(error_rate_marker(0.5), "🟢");
        assert_eq!(error_rate_marker(2.0), "🟡");
        assert_eq!(error_rate_marker(7.5), "🔴");
    }

    #[tokio::test]
    async fn test_unreachable_prometheus_reports_connection_error() {
        let client = PrometheusClient::new("http://127.0.0.1:9").unwrap();
        let value = CheckPrometheusHealth(client).invoke(JsonMap::new()).await.unwrap();
        assert!(value["output"].as_str().unwrap().starts_with("❌ Cannot connect"));
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let client = PrometheusClient::new("http://127.0.0.1:9").unwrap();
        let args = domain::models::normalize_arguments(json!({"resource_type": "disk"}));
        let value = GetResourceUsage(client).invoke(args).await.unwrap();
        assert_eq!(
            value["output"],
            "❌ Unknown resource type: disk. Use 'cpu' or 'memory'."
        );
    }
}
