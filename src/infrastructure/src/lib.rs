pub mod argocd;
pub mod command_runner;
pub mod config;
pub mod gemini_client;
pub mod kubectl;
pub mod prometheus;
pub mod slack;
pub mod stores;
pub mod tools;

use argocd::ArgoCdClient;
use config::Config;
use domain::services::CommandRunner;
use kubectl::KubectlClient;
use prometheus::PrometheusClient;
use std::sync::Arc;
use tools::CapabilityRegistry;

/// CLI wrappers shared by the wizard and the capability sources.
#[derive(Clone)]
pub struct Clients {
    pub kubectl: KubectlClient,
    pub argocd: ArgoCdClient,
    pub prometheus: PrometheusClient,
}

impl Clients {
    pub fn new(config: &Config, runner: Arc<dyn CommandRunner>) -> shared::Result<Self> {
        let timeout = config.limits.command_timeout;
        Ok(Self {
            kubectl: KubectlClient::new(runner.clone(), timeout),
            argocd: ArgoCdClient::new(runner, config.argocd.clone(), timeout),
            prometheus: PrometheusClient::new(&config.prometheus_url)?,
        })
    }

    /// Registry over every built-in capability source.
    pub fn discover_capabilities(&self, config: &Config) -> CapabilityRegistry {
        let sources = tools::builtin_sources(
            self.kubectl.clone(),
            self.argocd.clone(),
            self.prometheus.clone(),
        );
        CapabilityRegistry::discover(&sources, config.limits.capability_timeout)
    }
}
