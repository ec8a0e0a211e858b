use crate::config::ArgoCdConfig;
use domain::services::{CommandOutput, CommandRunner};
use shared::text::code_block;
use shared::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const ARGOCD: &str = "argocd";
const LOGIN_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const LOGIN_TIMEOUT: Duration = Duration::from_secs(15);

pub const AUTH_FAILED: &str =
    "Failed to authenticate with ArgoCD. Please check server connection and credentials.";

const SUMMARY_FIELDS: [&str; 8] = [
    "Name:",
    "Project:",
    "Sync Status:",
    "Health Status:",
    "Sync Revision:",
    "Phase:",
    "Duration:",
    "Message:",
];

/// Wrapper over the `argocd` CLI. Every operation makes sure a session exists first.
#[derive(Clone)]
pub struct ArgoCdClient {
    runner: Arc<dyn CommandRunner>,
    config: ArgoCdConfig,
    timeout: Duration,
}

impl ArgoCdClient {
    pub fn new(runner: Arc<dyn CommandRunner>, config: ArgoCdConfig, timeout: Duration) -> Self {
        Self {
            runner,
            config,
            timeout,
        }
    }

    pub async fn ensure_login(&self) -> Result<()> {
        let check = self
            .runner
            .run(ARGOCD, &args(&["account", "get-user-info"]), LOGIN_CHECK_TIMEOUT)
            .await;
        if let Ok(out) = &check {
            if out.success && out.stdout.contains("Logged In: true") {
                return Ok(());
            }
        }

        let password = self.config.password.as_deref().ok_or_else(|| {
            error!("ARGOCD_PASSWORD is not set, cannot log in");
            Error::Configuration(AUTH_FAILED.to_string())
        })?;

        info!(server = %self.config.server, "logging into ArgoCD");
        let mut login = args(&["login", &self.config.server, "--username"]);
        login.push(self.config.username.clone());
        login.push("--password".into());
        login.push(password.to_string());
        login.extend(args(&["--grpc-web", "--plaintext", "--skip-test-tls"]));
        if self.config.insecure {
            login.push("--insecure".into());
        }

        match self.runner.run(ARGOCD, &login, LOGIN_TIMEOUT).await {
            Ok(out) if out.success => {
                info!("ArgoCD login successful");
                Ok(())
            }
            Ok(out) => {
                error!(stderr = %out.stderr.trim(), "ArgoCD login failed");
                Err(Error::CommandExecution(AUTH_FAILED.to_string()))
            }
            Err(e) => {
                error!(error = %e, "ArgoCD login error");
                Err(Error::CommandExecution(AUTH_FAILED.to_string()))
            }
        }
    }

    pub async fn list_applications(&self) -> Result<Vec<String>> {
        let out = self.checked(&["app", "list", "-o", "name"]).await?;
        Ok(non_empty_lines(&out.stdout))
    }

    /// Revision ids usable as rollback targets.
    pub async fn revision_ids(&self, app: &str) -> Result<Vec<String>> {
        let out = self.checked(&["app", "history", app, "-o", "id"]).await?;
        Ok(non_empty_lines(&out.stdout))
    }

    pub async fn status(&self, app: &str) -> Result<CommandOutput> {
        self.call(&["app", "get", app], self.timeout).await
    }

    pub async fn history(&self, app: &str) -> Result<CommandOutput> {
        self.call(&["app", "history", app], self.timeout).await
    }

    pub async fn sync(&self, app: &str, revision: Option<&str>) -> Result<CommandOutput> {
        let mut argv = vec!["app", "sync", app];
        if let Some(rev) = revision {
            argv.extend(["--revision", rev]);
        }
        self.call(&argv, self.timeout).await
    }

    /// Rollbacks can run well past the usual command timeout, so the caller sets it.
    pub async fn rollback(&self, app: &str, revision: &str, limit: Duration) -> Result<CommandOutput> {
        self.call(&["app", "rollback", app, revision], limit).await
    }

    async fn call(&self, argv: &[&str], limit: Duration) -> Result<CommandOutput> {
        self.ensure_login().await?;
        self.runner.run(ARGOCD, &args(argv), limit).await
    }

    async fn checked(&self, argv: &[&str]) -> Result<CommandOutput> {
        let out = self.call(argv, self.timeout).await?;
        if out.success {
            Ok(out)
        } else {
            error!(args = ?argv, stderr = %out.stderr.trim(), "argocd command failed");
            Err(Error::CommandExecution(out.stderr.trim().to_string()))
        }
    }
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn non_empty_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Summary lines of a rollback's output, starting at `Name:` and stopping at the
/// resource table or the first blank line.
pub fn rollback_summary(stdout: &str) -> Option<String> {
    let lines: Vec<&str> = stdout.trim().lines().collect();
    let start = lines.iter().position(|l| l.starts_with("Name:"))?;

    let mut summary = Vec::new();
    for line in &lines[start..] {
        if SUMMARY_FIELDS.iter().any(|field| line.starts_with(field)) {
            summary.push(*line);
        } else if line.starts_with("GROUP") || line.trim().is_empty() {
            break;
        }
    }
    Some(summary.join("\n"))
}

/// Channel message reporting how a rollback ended.
pub fn rollback_report(app: &str, revision: &str, outcome: &Result<CommandOutput>) -> String {
    match outcome {
        Ok(out) if out.success => match rollback_summary(&out.stdout) {
            Some(summary) => format!(
                "✅ **Rollback completed for `{}` to revision `{}`**\n{}",
                app,
                revision,
                code_block(&summary)
            ),
            None => format!(
                "✅ **Rollback completed successfully**\nApplication: `{}`\nRevision: `{}`",
                app, revision
            ),
        },
        Ok(out) => {
            let stderr = out.stderr.trim();
            if stderr.contains("auto-sync is enabled") {
                format!(
                    "⚠️ **Rollback blocked**: Auto-sync is enabled for `{app}`\n\n\
                     **Options to resolve:**\n\
                     • Disable auto-sync: `argocd app set {app} --sync-policy=none`\n\
                     • Use manual sync instead: `argocd app sync {app} --revision {revision}`\n\
                     • Or rollback via Git repository\n\n{block}",
                    app = app,
                    revision = revision,
                    block = code_block(stderr)
                )
            } else {
                format!("❌ Rollback failed:\n{}", code_block(stderr))
            }
        }
        Err(e) => format!("❌ Rollback failed:\n{}", code_block(&e.user_message())),
    }
}
