use super::{required_str, str_arg};
use crate::argocd::ArgoCdClient;
use anyhow::anyhow;
use async_trait::async_trait;
use domain::models::ToolParameters;
use domain::services::{Capability, CapabilitySource, CommandOutput};
use serde_json::{json, Value};
use shared::types::JsonMap;

fn app_param() -> ToolParameters {
    ToolParameters::empty().required("app_name", "string", "ArgoCD application name")
}

fn output_or_error(out: CommandOutput) -> anyhow::Result<Value> {
    if out.success {
        Ok(json!({ "output": out.stdout.trim() }))
    } else {
        Err(anyhow!(out.stderr.trim().to_string()))
    }
}

pub struct ArgoCdSource {
    argocd: ArgoCdClient,
}

impl ArgoCdSource {
    pub fn new(argocd: ArgoCdClient) -> Self {
        Self { argocd }
    }
}

impl CapabilitySource for ArgoCdSource {
    fn source_name(&self) -> &str {
        "argocd"
    }

    fn capabilities(&self) -> Vec<Box<dyn Capability>> {
        let a = &self.argocd;
        vec![
            Box::new(GetApplications(a.clone())),
            Box::new(GetApplicationRevisions(a.clone())),
            Box::new(GetApplicationStatus(a.clone())),
            Box::new(GetApplicationHistory(a.clone())),
            Box::new(SyncApplication(a.clone())),
        ]
    }
}

pub struct GetApplications(ArgoCdClient);

#[async_trait]
impl Capability for GetApplications {
    fn name(&self) -> &str {
        "get_applications"
    }

    fn description(&self) -> &str {
        "Get all ArgoCD applications"
    }

    async fn invoke(&self, _args: JsonMap) -> anyhow::Result<Value> {
        Ok(json!(self.0.list_applications().await?))
    }
}

pub struct GetApplicationRevisions(ArgoCdClient);

#[async_trait]
impl Capability for GetApplicationRevisions {
    fn name(&self) -> &str {
        "get_application_revisions"
    }

    fn description(&self) -> &str {
        "Get the revision ids of an ArgoCD application that can be rolled back to"
    }

    fn parameters(&self) -> ToolParameters {
        app_param()
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        let app = required_str(&args, "app_name")?;
        Ok(json!(self.0.revision_ids(app).await?))
    }
}

pub struct GetApplicationStatus(ArgoCdClient);

#[async_trait]
impl Capability for GetApplicationStatus {
    fn name(&self) -> &str {
        "get_application_status"
    }

    fn description(&self) -> &str {
        "Get ArgoCD application status including sync and health state"
    }

    fn parameters(&self) -> ToolParameters {
        app_param()
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        let app = required_str(&args, "app_name")?;
        output_or_error(self.0.status(app).await?)
    }
}

pub struct GetApplicationHistory(ArgoCdClient);

#[async_trait]
impl Capability for GetApplicationHistory {
    fn name(&self) -> &str {
        "get_application_history"
    }

    fn description(&self) -> &str {
        "Get ArgoCD application deployment history"
    }

    fn parameters(&self) -> ToolParameters {
        app_param()
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        let app = required_str(&args, "app_name")?;
        output_or_error(self.0.history(app).await?)
    }
}

pub struct SyncApplication(ArgoCdClient);

#[async_trait]
impl Capability for SyncApplication {
    fn name(&self) -> &str {
        "sync_application"
    }

    fn description(&self) -> &str {
        "Sync an ArgoCD application, optionally to a specific revision"
    }

    fn parameters(&self) -> ToolParameters {
        app_param().optional("revision", "string", "Revision to sync to")
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value> {
        let app = required_str(&args, "app_name")?;
        output_or_error(self.0.sync(app, str_arg(&args, "revision")).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArgoCdConfig;
    use crate::kubectl::tests::ScriptedRunner;
    use domain::models::normalize_arguments;
    use std::sync::Arc;
    use std::time::Duration;

    fn client(runner: Arc<ScriptedRunner>) -> ArgoCdClient {
        let config = ArgoCdConfig {
            server: "argocd.local:80".to_string(),
            username: "admin".to_string(),
            password: Some("pw".to_string()),
            insecure: false,
        };
        ArgoCdClient::new(runner, config, Duration::from_secs(5))
    }

    fn logged_in(reply: CommandOutput) -> Arc<ScriptedRunner> {
        Arc::new(ScriptedRunner::new(move |line| {
            if line[1] == "account" {
                Ok(CommandOutput::ok("Logged In: true"))
            } else {
                Ok(reply.clone())
            }
        }))
    }

    #[tokio::test]
    async fn test_sync_passes_revision() {
        let runner = logged_in(CommandOutput::ok("synced\n"));
        let value = SyncApplication(client(runner.clone()))
            .invoke(normalize_arguments(json!({"app_name": "guestbook", "revision": "abc123"})))
            .await
            .unwrap();
        assert_eq!(value["output"], "synced");
        assert_eq!(
            runner.calls()[1],
            vec!["argocd", "app", "sync", "guestbook", "--revision", "abc123"]
        );
    }

    #[tokio::test]
    async fn test_status_failure_is_error() {
        let runner = logged_in(CommandOutput::failed(20, "application 'nope' not found"));
        let err = GetApplicationStatus(client(runner))
            .invoke(normalize_arguments(json!({"app_name": "nope"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
