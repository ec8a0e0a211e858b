use domain::services::{CommandOutput, CommandRunner};
use shared::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const KUBECTL: &str = "kubectl";
const NAMES_JSONPATH: &str = "jsonpath={.items[*].metadata.name}";

/// Thin wrapper over the `kubectl` CLI.
#[derive(Clone)]
pub struct KubectlClient {
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl KubectlClient {
    pub fn new(runner: Arc<dyn CommandRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Run `kubectl <args>` and return whatever it printed, success or not.
    pub async fn run(&self, args: Vec<String>) -> Result<CommandOutput> {
        self.runner.run(KUBECTL, &args, self.timeout).await
    }

    pub async fn list_namespaces(&self) -> Result<Vec<String>> {
        self.list_names(vec!["get".into(), "namespaces".into()]).await
    }

    pub async fn list_pods(&self, namespace: &str) -> Result<Vec<String>> {
        self.list_names(vec![
            "get".into(),
            "pods".into(),
            "-n".into(),
            namespace.to_string(),
        ])
        .await
    }

    pub async fn list_deployments(&self, namespace: &str) -> Result<Vec<String>> {
        self.list_names(vec![
            "get".into(),
            "deployments".into(),
            "-n".into(),
            namespace.to_string(),
        ])
        .await
    }

    pub async fn pod_logs(&self, pod: &str, namespace: &str, lines: u64) -> Result<String> {
        let out = self
            .run(vec![
                "logs".into(),
                pod.to_string(),
                "-n".into(),
                namespace.to_string(),
                "--tail".into(),
                lines.to_string(),
            ])
            .await?;
        Self::stdout_or_error(out)
    }

    pub async fn describe_pod(&self, pod: &str, namespace: &str) -> Result<String> {
        let out = self
            .run(vec![
                "describe".into(),
                "pod".into(),
                pod.to_string(),
                "-n".into(),
                namespace.to_string(),
            ])
            .await?;
        Self::stdout_or_error(out)
    }

    async fn list_names(&self, mut args: Vec<String>) -> Result<Vec<String>> {
        args.push("-o".into());
        args.push(NAMES_JSONPATH.into());
        let out = self.run(args).await?;
        if !out.success {
            warn!(stderr = %out.stderr.trim(), "kubectl listing failed");
            return Err(Error::CommandExecution(out.stderr.trim().to_string()));
        }
        Ok(parse_names(&out.stdout))
    }

    fn stdout_or_error(out: CommandOutput) -> Result<String> {
        if out.success {
            Ok(out.stdout)
        } else {
            Err(Error::CommandExecution(out.stderr.trim().to_string()))
        }
    }
}

/// Split jsonpath name output; stray quotes from copy-pasted templates are dropped.
pub fn parse_names(stdout: &str) -> Vec<String> {
    stdout
        .trim()
        .trim_matches('\'')
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
