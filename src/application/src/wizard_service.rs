//! Menu-driven selection wizard.
//!
//! Each menu choice arrives as a [`WizardStep`] plus the chosen value. The
//! wizard keeps per-channel [`SelectionState`], posts the next menu and, once
//! the selection is complete, runs the matching kubectl or argocd command
//! and posts its output. Rollbacks are long-running: they are acknowledged
//! right away and reported from a background task.

use domain::entities::{SelectionState, WizardCommand, WizardStep};
use domain::services::{ChatTransport, CommandOutput, OutgoingMessage, SelectionStore};
use infrastructure::argocd::{rollback_report, ArgoCdClient};
use infrastructure::kubectl::KubectlClient;
use infrastructure::slack::blocks;
use serde_json::Value;
use shared::text::{code_block, truncate_chars};
use shared::types::ChannelId;
use shared::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

const START_OVER: &str = "Invalid command sequence. Please start over.";
const NAMESPACE_MISSING: &str = "Namespace not selected. Please start over.";
const ROLLBACK_SEQUENCE: &str = "Invalid rollback sequence. Please start over.";
const NO_NAMESPACES: &str = "❌ No namespaces found or error connecting to the cluster.";
const NO_APPLICATIONS: &str = "❌ No ArgoCD applications found or error connecting to ArgoCD.";
const NO_REVISIONS: &str =
    "❌ No revisions found for this application or error fetching revisions.";
const ROLLBACK_RUNNING: &str =
    "⏳ A rollback is already running in this channel. Please wait for it to finish.";

fn start_over(message: &str) -> Error {
    Error::InvalidWizardSequence(message.to_string())
}

pub struct WizardService {
    selections: Arc<dyn SelectionStore>,
    transport: Arc<dyn ChatTransport>,
    kubectl: KubectlClient,
    argocd: ArgoCdClient,
    max_output_chars: usize,
    rollback_timeout: Duration,
    rollbacks: Mutex<HashMap<ChannelId, JoinHandle<()>>>,
}

impl WizardService {
    pub fn new(
        selections: Arc<dyn SelectionStore>,
        transport: Arc<dyn ChatTransport>,
        kubectl: KubectlClient,
        argocd: ArgoCdClient,
        max_output_chars: usize,
        rollback_timeout: Duration,
    ) -> Self {
        Self {
            selections,
            transport,
            kubectl,
            argocd,
            max_output_chars,
            rollback_timeout,
            rollbacks: Mutex::new(HashMap::new()),
        }
    }

    /// Post the first menu in reply to a mention or the slash command.
    pub async fn start(&self, channel: &str, user_id: &str) -> Result<()> {
        info!(channel = %channel, user_id = %user_id, "starting selection wizard");
        self.post_blocks(channel, blocks::command_menu(user_id)).await
    }

    /// Advance the wizard for one menu choice. Errors never escape: a bad
    /// sequence is explained in the channel, anything else is logged and
    /// reported as briefly as possible.
    pub async fn handle_selection(&self, channel: &str, step: WizardStep, value: &str) {
        info!(channel = %channel, action_id = %step.action_id(), value = %value, "wizard selection");
        let outcome = match step {
            WizardStep::Command => self.select_command(channel, value).await,
            WizardStep::SubCommand => self.select_sub_command(channel, value).await,
            WizardStep::Namespace => self.select_namespace(channel, value).await,
            WizardStep::Pod => self.select_pod(channel, value).await,
            WizardStep::Deployment => self.select_deployment(channel, value).await,
            WizardStep::ArgoApp => self.select_application(channel, value).await,
            WizardStep::ArgoRevision => self.select_revision(channel, value).await,
        };

        match outcome {
            Ok(()) => {}
            Err(Error::InvalidWizardSequence(message)) => {
                warn!(channel = %channel, action_id = %step.action_id(), "{}", message);
                self.post_text_logged(channel, message).await;
            }
            Err(Error::Transport(e)) => {
                error!(channel = %channel, error = %e, "could not post wizard reply");
            }
            Err(e) => {
                error!(channel = %channel, error = %e, "wizard step failed");
                self.post_text_logged(channel, format!("❌ {}", e.user_message()))
                    .await;
            }
        }
    }

    async fn select_command(&self, channel: &str, value: &str) -> Result<()> {
        let command = WizardCommand::parse(value).ok_or_else(|| start_over(START_OVER))?;
        self.selections
            .put(channel, SelectionState::with_command(command))
            .await;
        self.post_blocks(channel, blocks::sub_command_menu(command))
            .await
    }

    async fn select_sub_command(&self, channel: &str, value: &str) -> Result<()> {
        let state = self.current(channel, START_OVER).await?;
        let command = state.command.ok_or_else(|| start_over(START_OVER))?;
        if !command.accepts(value) {
            return Err(start_over(START_OVER));
        }

        let sub_command = value.to_string();
        self.advance(channel, state, move |s| {
            s.sub_command = Some(sub_command);
            s.scope = None;
            s.target = None;
        })
        .await?;

        if command.is_deployment_platform() {
            match self.argocd.list_applications().await {
                Ok(apps) if !apps.is_empty() => {
                    self.post_blocks(channel, blocks::application_menu(&apps))
                        .await
                }
                Ok(_) => self.post_text(channel, NO_APPLICATIONS).await,
                Err(e) => {
                    error!(error = %e, "listing ArgoCD applications failed");
                    self.post_text(channel, NO_APPLICATIONS).await
                }
            }
        } else {
            match self.kubectl.list_namespaces().await {
                Ok(namespaces) if !namespaces.is_empty() => {
                    self.post_blocks(channel, blocks::namespace_menu(&namespaces))
                        .await
                }
                Ok(_) => self.post_text(channel, NO_NAMESPACES).await,
                Err(e) => {
                    error!(error = %e, "listing namespaces failed");
                    self.post_text(channel, NO_NAMESPACES).await
                }
            }
        }
    }

    async fn select_namespace(&self, channel: &str, namespace: &str) -> Result<()> {
        let state = self.current(channel, START_OVER).await?;
        let (command, sub_command) = state
            .command_pair()
            .filter(|(c, _)| !c.is_deployment_platform())
            .ok_or_else(|| start_over(START_OVER))?;
        let sub_command = sub_command.to_string();

        self.set_scope(channel, &state, namespace).await?;

        match (command, sub_command.as_str()) {
            (WizardCommand::Describe | WizardCommand::Logs, "pods") => {
                let pods = self.kubectl.list_pods(namespace).await?;
                if pods.is_empty() {
                    self.post_text(channel, format!("❌ No pods found in namespace `{}`.", namespace))
                        .await
                } else {
                    self.post_blocks(channel, blocks::pod_menu(&pods)).await
                }
            }
            (WizardCommand::RolloutRestart, "deployments") => {
                let deployments = self.kubectl.list_deployments(namespace).await?;
                if deployments.is_empty() {
                    self.post_text(
                        channel,
                        format!("❌ No deployments found in namespace `{}`.", namespace),
                    )
                    .await
                } else {
                    self.post_blocks(channel, blocks::deployment_menu(&deployments))
                        .await
                }
            }
            _ => {
                let mut args = command.kubectl_verb();
                args.extend([sub_command, "-n".to_string(), namespace.to_string()]);
                self.run_kubectl(channel, args).await
            }
        }
    }

    async fn select_pod(&self, channel: &str, pod: &str) -> Result<()> {
        let state = self.current(channel, START_OVER).await?;
        let namespace = state
            .scope()
            .map(str::to_string)
            .ok_or_else(|| start_over(NAMESPACE_MISSING))?;
        let ns = namespace.as_str();
        let args = match state.command {
            Some(WizardCommand::Logs) => strings(&["logs", pod, "-n", ns]),
            Some(WizardCommand::Describe) => strings(&["describe", "pod", pod, "-n", ns]),
            _ => return Err(start_over(START_OVER)),
        };

        self.set_target(channel, &state, pod).await?;
        self.run_kubectl(channel, args).await
    }

    async fn select_deployment(&self, channel: &str, deployment: &str) -> Result<()> {
        let state = self.current(channel, START_OVER).await?;
        let namespace = state
            .scope()
            .map(str::to_string)
            .ok_or_else(|| start_over(NAMESPACE_MISSING))?;
        let Some(WizardCommand::RolloutRestart) = state.command else {
            return Err(start_over(START_OVER));
        };

        self.set_target(channel, &state, deployment).await?;
        let ns = namespace.as_str();
        let args = strings(&["rollout", "restart", "deployment", deployment, "-n", ns]);
        self.run_kubectl(channel, args).await
    }

    async fn select_application(&self, channel: &str, app: &str) -> Result<()> {
        let state = self.current(channel, START_OVER).await?;
        let sub_command = match state.command_pair() {
            Some((WizardCommand::Argo, sub)) => sub.to_string(),
            _ => return Err(start_over(START_OVER)),
        };

        match sub_command.as_str() {
            "status" => {
                self.set_scope(channel, &state, app).await?;
                let outcome = self.argocd.status(app).await;
                self.post_command_outcome(channel, outcome).await
            }
            "revisions" => {
                self.set_scope(channel, &state, app).await?;
                let outcome = self.argocd.history(app).await;
                self.post_command_outcome(channel, outcome).await
            }
            "rollback" => {
                self.set_scope(channel, &state, app).await?;
                match self.argocd.revision_ids(app).await {
                    Ok(revisions) if !revisions.is_empty() => {
                        self.post_blocks(channel, blocks::revision_menu(&revisions))
                            .await
                    }
                    Ok(_) => self.post_text(channel, NO_REVISIONS).await,
                    Err(e) => {
                        error!(app = %app, error = %e, "listing revisions failed");
                        self.post_text(channel, NO_REVISIONS).await
                    }
                }
            }
            _ => Err(start_over(START_OVER)),
        }
    }

    async fn select_revision(&self, channel: &str, revision: &str) -> Result<()> {
        let state = self.current(channel, ROLLBACK_SEQUENCE).await?;
        let app = match (state.command_pair(), state.scope()) {
            (Some((WizardCommand::Argo, "rollback")), Some(app)) => app.to_string(),
            _ => return Err(start_over(ROLLBACK_SEQUENCE)),
        };

        // Held until the new task is registered so two picks cannot both start one.
        let mut rollbacks = self.rollbacks.lock().await;
        rollbacks.retain(|_, h| !h.is_finished());
        if rollbacks.contains_key(channel) {
            warn!(channel = %channel, app = %app, revision = %revision, "rollback already running");
            return self.post_text(channel, ROLLBACK_RUNNING).await;
        }

        self.set_target(channel, &state, revision).await?;
        self.post_text(
            channel,
            format!(
                "🔄 Initiating rollback for `{}` to revision `{}`...\nPlease wait, this may take a few moments.",
                app, revision
            ),
        )
        .await?;

        let handle = self.spawn_rollback(channel, app, revision.to_string());
        rollbacks.insert(channel.to_string(), handle);
        Ok(())
    }

    fn spawn_rollback(&self, channel: &str, app: String, revision: String) -> JoinHandle<()> {
        let argocd = self.argocd.clone();
        let transport = self.transport.clone();
        let limit = self.rollback_timeout;
        let target = channel.to_string();

        info!(channel = %channel, app = %app, revision = %revision, "starting rollback");
        tokio::spawn(async move {
            let outcome = match timeout(limit, argocd.rollback(&app, &revision, limit)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(Error::Timeout(limit.as_secs())),
            };
            match &outcome {
                Ok(out) if out.success => info!(app = %app, revision = %revision, "rollback completed"),
                Ok(out) => warn!(app = %app, stderr = %out.stderr.trim(), "rollback failed"),
                Err(e) => error!(app = %app, error = %e, "rollback failed"),
            }
            let report = rollback_report(&app, &revision, &outcome);
            if let Err(e) = transport.post(OutgoingMessage::text(&target, report)).await {
                error!(channel = %target, error = %e, "could not post rollback result");
            }
        })
    }

    /// Wait for the channel's background rollback, if any, to finish.
    pub async fn wait_for_rollback(&self, channel: &str) {
        let handle = self.rollbacks.lock().await.remove(channel);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(channel = %channel, error = %e, "rollback task ended abnormally");
            }
        }
    }

    /// Abort the channel's background rollback; false when none was running.
    pub async fn cancel_rollback(&self, channel: &str) -> bool {
        match self.rollbacks.lock().await.remove(channel) {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Abort every outstanding rollback, e.g. on shutdown.
    pub async fn cancel_all(&self) -> usize {
        let mut rollbacks = self.rollbacks.lock().await;
        let running = rollbacks.values().filter(|h| !h.is_finished()).count();
        for (_, handle) in rollbacks.drain() {
            handle.abort();
        }
        running
    }

    async fn current(&self, channel: &str, message: &str) -> Result<SelectionState> {
        self.selections
            .get(channel)
            .await
            .ok_or_else(|| start_over(message))
    }

    /// Write the next step only if the channel still holds `seen`; a menu
    /// choice made meanwhile means this one is stale.
    async fn advance<F>(&self, channel: &str, seen: SelectionState, apply: F) -> Result<()>
    where
        F: FnOnce(&mut SelectionState) + Send + 'static,
    {
        self.selections
            .update(
                channel,
                Box::new(move |s| {
                    if *s != seen {
                        return false;
                    }
                    apply(s);
                    true
                }),
            )
            .await
            .map(|_| ())
            .ok_or_else(|| start_over(START_OVER))
    }

    async fn set_scope(&self, channel: &str, seen: &SelectionState, scope: &str) -> Result<()> {
        let scope = scope.to_string();
        self.advance(channel, seen.clone(), move |s| {
            s.scope = Some(scope);
            s.target = None;
        })
        .await
    }

    async fn set_target(&self, channel: &str, seen: &SelectionState, target: &str) -> Result<()> {
        let target = target.to_string();
        self.advance(channel, seen.clone(), move |s| s.target = Some(target))
            .await
    }

    async fn run_kubectl(&self, channel: &str, args: Vec<String>) -> Result<()> {
        info!(channel = %channel, command = %args.join(" "), "running kubectl");
        let outcome = self.kubectl.run(args).await;
        self.post_command_outcome(channel, outcome).await
    }

    async fn post_command_outcome(&self, channel: &str, outcome: Result<CommandOutput>) -> Result<()> {
        let text = match outcome {
            Ok(out) if out.success => {
                let shown = out.combined();
                let body = if shown.is_empty() {
                    "(no output)".to_string()
                } else {
                    truncate_chars(&shown, self.max_output_chars)
                };
                code_block(&body)
            }
            Ok(out) => format!(
                "Error executing command:\n{}",
                code_block(&truncate_chars(&out.combined(), self.max_output_chars))
            ),
            Err(e) => {
                error!(channel = %channel, error = %e, "command could not be run");
                format!("Error executing command:\n{}", code_block(&e.user_message()))
            }
        };
        self.post_text(channel, text).await
    }

    async fn post_text(&self, channel: &str, text: impl Into<String>) -> Result<()> {
        self.transport
            .post(OutgoingMessage::text(channel, text))
            .await
            .map(|_| ())
    }

    async fn post_text_logged(&self, channel: &str, text: impl Into<String>) {
        if let Err(e) = self.post_text(channel, text).await {
            error!(channel = %channel, error = %e, "could not post wizard reply");
        }
    }

    async fn post_blocks(&self, channel: &str, menu: Value) -> Result<()> {
        self.transport
            .post(OutgoingMessage::blocks(channel, menu))
            .await
            .map(|_| ())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
