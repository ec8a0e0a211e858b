//! k2sobot: Slack ChatOps bot for Kubernetes and ArgoCD.
//!
//! # Environment Variables
//!
//! - `SLACK_TOKEN`: bot token used to post replies
//! - `GEMINI_API_KEY`: enables free-text chat in direct messages
//! - `ARGOCD_SERVER`, `ARGOCD_USERNAME`, `ARGOCD_PASSWORD`: deployment platform login
//! - `PROMETHEUS_URL`: metrics backend for the monitoring capabilities

use clap::Parser;
use presentation::cli::{self, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "k2sobot=info,application=info,infrastructure=info,presentation=info,tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    cli::run(Cli::parse(), shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        },
    }
}
