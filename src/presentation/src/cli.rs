use anyhow::Context;
use application::{ChatService, EventDispatcher, WizardService};
use clap::{Parser, Subcommand};
use colored::Colorize;
use domain::services::{CommandRunner, ReasoningEngine};
use infrastructure::{
    command_runner::ProcessRunner,
    config::Config,
    gemini_client::GeminiClient,
    slack::SlackClient,
    stores::{InMemoryConversationStore, InMemorySelectionStore},
    tools::CapabilityRegistry,
    Clients,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::web::{state::AppState, AxumServer};

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Clone)]
#[command(name = "k2sobot")]
#[command(about = "Slack ChatOps bot for Kubernetes and ArgoCD", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone)]
pub enum Command {
    /// Run the Slack HTTP endpoints
    Serve {
        /// Listen address, overrides K2SOBOT_BIND
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// List the capabilities offered to the language model
    Tools,
    /// Ask the assistant one question from the terminal
    Ask {
        /// Conversation key the exchange is recorded under
        #[arg(long, default_value = "operator")]
        user: String,

        /// The question
        #[arg(required = true)]
        text: Vec<String>,
    },
}

pub async fn run<F>(cli: Cli, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let config = Config::load();
    match cli.command {
        Command::Serve { bind } => serve(config, bind, shutdown).await,
        Command::Tools => list_tools(&config),
        Command::Ask { user, text } => ask(&config, &user, &text.join(" ")).await,
    }
}

fn clients(config: &Config) -> anyhow::Result<Clients> {
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    Clients::new(config, runner).context("failed to build CLI clients")
}

fn chat_service(
    config: &Config,
    registry: Arc<CapabilityRegistry>,
) -> anyhow::Result<ChatService> {
    let engine = GeminiClient::new(&config.gemini).context("failed to build Gemini client")?;
    if engine.is_configured() {
        info!(model = %engine.model(), "reasoning engine ready");
    } else {
        warn!("GEMINI_API_KEY is not set; direct messages will not be answered");
    }
    let conversations = Arc::new(InMemoryConversationStore::new(
        config.limits.history_limit,
        config.limits.max_users,
    ));
    Ok(ChatService::new(
        Arc::new(engine),
        registry,
        conversations,
        config.gemini.system_prompt.clone(),
        config.limits.engine_timeout,
    ))
}

async fn serve<F>(config: Config, bind: Option<SocketAddr>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let clients = clients(&config)?;
    let registry = Arc::new(clients.discover_capabilities(&config));
    let chat = Arc::new(chat_service(&config, registry)?);

    let slack = Arc::new(SlackClient::new(&config.slack).context("failed to build Slack client")?);
    let bot_user_id = if slack.is_configured() {
        match slack.auth_test().await {
            Ok(id) => {
                info!(bot_user_id = %id, "authenticated with Slack");
                Some(id)
            }
            Err(e) => {
                warn!(error = %e, "Slack auth.test failed; own messages cannot be filtered by user id");
                None
            }
        }
    } else {
        warn!("SLACK_TOKEN is not set; replies cannot be posted");
        None
    };

    let selections = Arc::new(InMemorySelectionStore::new(
        config.limits.max_channels,
        config.limits.selection_ttl,
    ));
    let pruner = {
        let selections = selections.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
            loop {
                ticker.tick().await;
                let pruned = selections.prune_expired().await;
                if pruned > 0 {
                    tracing::debug!(pruned, "expired wizard selections dropped");
                }
            }
        })
    };

    let wizard = Arc::new(WizardService::new(
        selections,
        slack.clone(),
        clients.kubectl.clone(),
        clients.argocd.clone(),
        config.limits.max_output_chars,
        config.limits.rollback_timeout,
    ));
    let dispatcher = Arc::new(EventDispatcher::new(
        chat,
        wizard.clone(),
        slack,
        bot_user_id,
    ));

    let addr = bind.unwrap_or(config.bind_addr);
    let state = AppState::new(dispatcher, config.gemini_available());
    let outcome = AxumServer::new(state).run(addr, shutdown).await;

    pruner.abort();
    let cancelled = wizard.cancel_all().await;
    if cancelled > 0 {
        warn!(cancelled, "rollbacks still running at shutdown were cancelled");
    }
    info!("Server shutdown complete");
    outcome
}

fn list_tools(config: &Config) -> anyhow::Result<()> {
    let registry = clients(config)?.discover_capabilities(config);
    println!(
        "{} {}",
        "Capabilities:".bold(),
        registry.len().to_string().cyan()
    );
    for definition in registry.definitions() {
        println!("\n  {}", definition.name.green().bold());
        println!("    {}", definition.description);
        for (name, property) in &definition.parameters.properties {
            let required = definition.parameters.required.contains(name);
            println!(
                "    {} {} {}",
                "•".dimmed(),
                if required {
                    name.yellow().to_string()
                } else {
                    name.normal().to_string()
                },
                format!("({}) {}", property.param_type, property.description).dimmed()
            );
        }
    }
    Ok(())
}

async fn ask(config: &Config, user: &str, text: &str) -> anyhow::Result<()> {
    let clients = clients(config)?;
    let registry = Arc::new(clients.discover_capabilities(config));
    let chat = chat_service(config, registry)?;
    if !chat.is_available() {
        anyhow::bail!("GEMINI_API_KEY is not set");
    }

    println!("{} {}", "you:".bold().blue(), text);
    let reply = chat.chat(user, text).await;
    println!("{} {}", "k2sobot:".bold().green(), reply);
    Ok(())
}
