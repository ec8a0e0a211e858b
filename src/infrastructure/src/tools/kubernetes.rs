use super::{int_arg, required_str, str_arg};
use crate::kubectl::KubectlClient;
use async_trait::async_trait;
use domain::models::ToolParameters;
use domain::services::{Capability, CapabilitySource};
use serde_json::{json, Value};
use shared::types::JsonMap;

const DEFAULT_NAMESPACE: &str = "default";
const DEFAULT_LOG_LINES: i64 = 50;

fn namespace(args: &JsonMap) -> &str {
    str_arg(args, "namespace").unwrap_or(DEFAULT_NAMESPACE)
}

fn with_namespace(params: ToolParameters) -> ToolParameters {
    params.optional("namespace", "string", "Kubernetes namespace (default: default)")
}

pub struct KubernetesSource {
    kubectl: KubectlClient,
}

impl KubernetesSource {
    pub fn new(kubectl: KubectlClient) -> Self {
        Self { kubectl }
    }
}

impl CapabilitySource for KubernetesSource {
    fn source_name(&self) -> &str {
        "kubernetes"
    }

    fn capabilities(&self) -> Vec<Box<dyn Capability>> {
        let k = &self.kubectl;
        vec![
            Box::new(GetNamespaces(k.clone())),
            Box::new(GetPods(k.clone())),
            Box::new(GetDeployments(k.clone())),
            Box::new(GetPodLogs(k.clone())),
            Box::new(DescribePod(k.clone())),
        ]
    }
}

pub struct GetNamespaces(KubectlClient);

#[async_trait]
impl Capability for GetNamespaces {
    fn name(&self) -> &str {
        "get_namespaces"
    }

    fn description(&self) -> &str {
        "Get all Kubernetes namespaces"
    }

    async fn invoke(&self, _args: JsonMap) -> anyhow::Result<Value> {
        Ok(json!(self.0.list_namespaces().await?))
    }
}

pub struct GetPods(KubectlClient);

#[async_trait]
impl Capability for GetPods {
    fn name(&self) -> &str {
        "get_pods"
    }

    fn description(&self) -> &str {
        "Get all pods in a namespace"
    }

    fn parameters(&self) -> ToolParameters {
        with_namespace(ToolParameters::empty())
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        Ok(json!(self.0.list_pods(namespace(&args)).await?))
    }
}

pub struct GetDeployments(KubectlClient);

#[async_trait]
impl Capability for GetDeployments {
    fn name(&self) -> &str {
        "get_deployments"
    }

    fn description(&self) -> &str {
        "Get all deployments in a namespace"
    }

    fn parameters(&self) -> ToolParameters {
        with_namespace(ToolParameters::empty())
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        Ok(json!(self.0.list_deployments(namespace(&args)).await?))
    }
}

pub struct GetPodLogs(KubectlClient);

#[async_trait]
impl Capability for GetPodLogs {
    fn name(&self) -> &str {
        "get_pod_logs"
    }

    fn description(&self) -> &str {
        "Get the most recent log lines from a pod"
    }

    fn parameters(&self) -> ToolParameters {
        with_namespace(ToolParameters::empty().required("pod_name", "string", "Pod name"))
            .optional("lines", "integer", "Number of lines to return (default: 50)")
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        let pod = required_str(&args, "pod_name")?;
        let lines = int_arg(&args, "lines")
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_LOG_LINES);
        let logs = self.0.pod_logs(pod, namespace(&args), lines as u64).await?;
        Ok(json!({ "output": logs }))
    }
}

pub struct DescribePod(KubectlClient);

#[async_trait]
impl Capability for DescribePod {
    fn name(&self) -> &str {
        "describe_pod"
    }

    fn description(&self) -> &str {
        "Get detailed pod information (kubectl describe)"
    }

    fn parameters(&self) -> ToolParameters {
        with_namespace(ToolParameters::empty().required("pod_name", "string", "Pod name"))
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        let pod = required_str(&args, "pod_name")?;
        let description = self.0.describe_pod(pod, namespace(&args)).await?;
        Ok(json!({ "output": description }))
    }
}
