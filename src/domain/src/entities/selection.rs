//! Wizard selection state.
//!
//! The wizard narrows a request down step by step:
//! command → sub-command → scope → target. The cluster branch uses the
//! scope for a namespace and the target for a pod or deployment; the
//! deployment-platform branch (`argo`) uses the scope for an application
//! and the target for a revision.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level wizard operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WizardCommand {
    Get,
    Describe,
    Logs,
    RolloutRestart,
    Argo,
}

impl WizardCommand {
    pub const ALL: [WizardCommand; 5] = [
        WizardCommand::Get,
        WizardCommand::Describe,
        WizardCommand::Logs,
        WizardCommand::RolloutRestart,
        WizardCommand::Argo,
    ];

    /// Menu value, also the kubectl verb for the cluster branch.
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardCommand::Get => "get",
            WizardCommand::Describe => "describe",
            WizardCommand::Logs => "logs",
            WizardCommand::RolloutRestart => "rollout restart",
            WizardCommand::Argo => "argo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value.trim())
    }

    /// Sub-commands offered after this command is picked.
    pub fn sub_commands(&self) -> &'static [&'static str] {
        match self {
            WizardCommand::Get => &["pods", "nodes", "services"],
            WizardCommand::Describe => &["pods"],
            WizardCommand::Logs => &["pods"],
            WizardCommand::RolloutRestart => &["deployments"],
            WizardCommand::Argo => &["status", "revisions", "rollback"],
        }
    }

    pub fn accepts(&self, sub_command: &str) -> bool {
        self.sub_commands().contains(&sub_command)
    }

    pub fn is_deployment_platform(&self) -> bool {
        matches!(self, WizardCommand::Argo)
    }

    /// Verb split into kubectl arguments (`rollout restart` is two words).
    pub fn kubectl_verb(&self) -> Vec<String> {
        self.as_str().split_whitespace().map(str::to_string).collect()
    }
}

impl fmt::Display for WizardCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-channel in-progress wizard context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    pub command: Option<WizardCommand>,
    pub sub_command: Option<String>,
    /// Namespace (cluster branch) or application (`argo` branch).
    pub scope: Option<String>,
    /// Pod, deployment or revision.
    pub target: Option<String>,
}

impl SelectionState {
    pub fn with_command(command: WizardCommand) -> Self {
        Self {
            command: Some(command),
            ..Self::default()
        }
    }

    pub fn sub_command(&self) -> Option<&str> {
        self.sub_command.as_deref()
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Command and sub-command, only when both are set.
    pub fn command_pair(&self) -> Option<(WizardCommand, &str)> {
        Some((self.command?, self.sub_command.as_deref()?))
    }
}

/// Which menu a selection event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WizardStep {
    Command,
    SubCommand,
    Namespace,
    Pod,
    Deployment,
    ArgoApp,
    ArgoRevision,
}

impl WizardStep {
    pub const ALL: [WizardStep; 7] = [
        WizardStep::Command,
        WizardStep::SubCommand,
        WizardStep::Namespace,
        WizardStep::Pod,
        WizardStep::Deployment,
        WizardStep::ArgoApp,
        WizardStep::ArgoRevision,
    ];

    /// Action id carried by the interactive menu element.
    pub fn action_id(&self) -> &'static str {
        match self {
            WizardStep::Command => "kubectl_command_select",
            WizardStep::SubCommand => "kubectl_sub_command_select",
            WizardStep::Namespace => "kubectl_namespace_select",
            WizardStep::Pod => "kubectl_pod_select",
            WizardStep::Deployment => "kubectl_deployment_select",
            WizardStep::ArgoApp => "argo_app_select",
            WizardStep::ArgoRevision => "argo_revision_select",
        }
    }

    pub fn from_action_id(action_id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.action_id() == action_id)
    }
}
