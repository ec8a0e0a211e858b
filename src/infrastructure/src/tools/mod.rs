//! Capability registry and the built-in capability sources.
//!
//! Sources are offered to [`CapabilityRegistry::discover`] once at start-up;
//! the registry is read-only afterwards and can be shared behind an `Arc`
//! without locking.

pub mod argocd;
pub mod jokes;
pub mod kubernetes;
pub mod presidents;
pub mod prometheus;
pub mod time;

use crate::argocd::ArgoCdClient;
use crate::kubectl::KubectlClient;
use crate::prometheus::PrometheusClient;
use anyhow::anyhow;
use domain::models::ToolDefinition;
use domain::services::{Capability, CapabilitySource};
use serde_json::{json, Value};
use shared::types::JsonMap;
use shared::{Error, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

pub struct CapabilityRegistry {
    capabilities: Vec<Box<dyn Capability>>,
    index: HashMap<String, usize>,
    timeout: Duration,
}

impl CapabilityRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            capabilities: Vec::new(),
            index: HashMap::new(),
            timeout,
        }
    }

    /// Index every acceptable capability offered by `sources`, in order.
    pub fn discover(sources: &[Box<dyn CapabilitySource>], timeout: Duration) -> Self {
        let mut registry = Self::new(timeout);
        for source in sources {
            for capability in source.capabilities() {
                registry.register(capability);
            }
            debug!(source = %source.source_name(), "capability source loaded");
        }
        info!(
            "Discovered {} capabilities from {} sources",
            registry.len(),
            sources.len()
        );
        registry
    }

    /// Returns false when the capability was rejected.
    pub fn register(&mut self, capability: Box<dyn Capability>) -> bool {
        let name = capability.name().to_string();
        if !is_identifier_safe(&name) || name.starts_with('_') {
            debug!(capability = %name, "skipping capability with private or unsafe name");
            return false;
        }
        if capability.description().trim().is_empty() {
            debug!(capability = %name, "skipping capability without description");
            return false;
        }
        if self.index.contains_key(&name) {
            warn!(capability = %name, "duplicate capability name, keeping the first");
            return false;
        }
        self.index.insert(name, self.capabilities.len());
        self.capabilities.push(capability);
        true
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declarations handed to the reasoning engine, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.capabilities.iter().map(|c| c.definition()).collect()
    }

    pub async fn try_execute(&self, name: &str, args: JsonMap) -> Result<Value> {
        let capability = self
            .index
            .get(name)
            .map(|&i| &self.capabilities[i])
            .ok_or_else(|| Error::UnknownCapability(name.to_string()))?;

        let params = capability.parameters();
        if let Some(missing) = params.required.iter().find(|p| !args.contains_key(*p)) {
            return Err(Error::CapabilityExecution {
                name: name.to_string(),
                message: format!("missing required argument: {}", missing),
            });
        }

        let shown = Value::Object(args.clone());
        info!(capability = %name, args = %shown, "executing capability");
        match timeout(self.timeout, capability.invoke(args)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::CapabilityExecution {
                name: name.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(Error::Timeout(self.timeout.as_secs())),
        }
    }

    /// Never fails: lookup misses, handler errors and timeouts come back as
    /// `{"error": message}`.
    pub async fn execute(&self, name: &str, args: JsonMap) -> Value {
        match self.try_execute(name, args).await {
            Ok(value) => value,
            Err(e) => {
                error!(capability = %name, error = %e, "capability failed");
                let message = match e {
                    Error::UnknownCapability(n) => format!("Unknown function: {}", n),
                    Error::CapabilityExecution { message, .. } => message,
                    other => other.user_message(),
                };
                json!({ "error": message })
            }
        }
    }
}

pub fn is_identifier_safe(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Sources shipped with the bot, in discovery order.
pub fn builtin_sources(
    kubectl: KubectlClient,
    argocd: ArgoCdClient,
    prometheus: PrometheusClient,
) -> Vec<Box<dyn CapabilitySource>> {
    vec![
        Box::new(time::TimeSource),
        Box::new(jokes::JokeSource),
        Box::new(kubernetes::KubernetesSource::new(kubectl)),
        Box::new(argocd::ArgoCdSource::new(argocd)),
        Box::new(prometheus::PrometheusSource::new(prometheus)),
        Box::new(presidents::PresidentSource),
    ]
}

pub(crate) fn str_arg<'a>(args: &'a JsonMap, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(crate) fn required_str<'a>(args: &'a JsonMap, key: &str) -> anyhow::Result<&'a str> {
    str_arg(args, key).ok_or_else(|| anyhow!("missing required argument: {}", key))
}

/// Integers may arrive as numbers (possibly with a fraction) or as strings.
pub(crate) fn int_arg(args: &JsonMap, key: &str) -> Option<i64> {
    match args.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain::models::ToolParameters;

    struct Fixed {
        name: &'static str,
        description: &'static str,
    }

    #[async_trait]
    impl Capability for Fixed {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            self.description
        }
        async fn invoke(&self, _args: JsonMap) -> anyhow::Result<Value> {
            Ok(json!({ "from": self.description }))
        }
    }

    struct Failing;

    #[async_trait]
    impl Capability for Failing {
        fn name(&self) -> &str {
            "always_fails"
        }
        fn description(&self) -> &str {
            "Fails every time"
        }
        fn parameters(&self) -> ToolParameters {
            ToolParameters::empty().required("target", "string", "What to fail on")
        }
        async fn invoke(&self, _args: JsonMap) -> anyhow::Result<Value> {
            Err(anyhow!("cluster unreachable"))
        }
    }

    struct Slow;

    #[async_trait]
    impl Capability for Slow {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "Never answers in time"
        }
        async fn invoke(&self, _args: JsonMap) -> anyhow::Result<Value> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }
    }

    struct Listing(Vec<(&'static str, &'static str)>);

    impl CapabilitySource for Listing {
        fn source_name(&self) -> &str {
            "listing"
        }
        fn capabilities(&self) -> Vec<Box<dyn Capability>> {
            self.0
                .iter()
                .map(|&(name, description)| Box::new(Fixed { name, description }) as Box<dyn Capability>)
                .collect()
        }
    }

    #[test]
    fn test_discovery_filters_and_keeps_first_duplicate() {
        let sources: Vec<Box<dyn CapabilitySource>> = vec![
            Box::new(Listing(vec![
                ("get_pods", "first"),
                ("undocumented", "   "),
                ("_private", "hidden helper"),
                ("bad-name", "not an identifier"),
            ])),
            Box::new(Listing(vec![("get_pods", "second")])),
        ];
        let registry = CapabilityRegistry::discover(&sources, Duration::from_secs(1));

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("get_pods"));
        assert!(!registry.contains("undocumented"));
        assert!(!registry.contains("_private"));
        assert_eq!(registry.definitions()[0].description, "first");
    }

    #[tokio::test]
    async fn test_unknown_capability_is_structured_error() {
        let registry = CapabilityRegistry::new(Duration::from_secs(1));
        let err = registry.try_execute("nonexistent", JsonMap::new()).await;
        assert!(matches!(err, Err(Error::UnknownCapability(_))));

        let value = registry.execute("nonexistent", JsonMap::new()).await;
        assert_eq!(value, json!({"error": "Unknown function: nonexistent"}));
    }

    #[tokio::test]
    async fn test_handler_fault_does_not_propagate() {
        let mut registry = CapabilityRegistry::new(Duration::from_secs(1));
        registry.register(Box::new(Failing));

        let missing = registry.execute("always_fails", JsonMap::new()).await;
        assert_eq!(missing, json!({"error": "missing required argument: target"}));

        let mut args = JsonMap::new();
        args.insert("target".to_string(), json!("prod"));
        let failed = registry.execute("always_fails", args).await;
        assert_eq!(failed, json!({"error": "cluster unreachable"}));
    }

    #[tokio::test]
    async fn test_timeout_becomes_error_value() {
        let mut registry = CapabilityRegistry::new(Duration::from_millis(20));
        registry.register(Box::new(Slow));
        let value = registry.execute("slow", JsonMap::new()).await;
        assert_eq!(value, json!({"error": "timeout"}));
    }

    #[test]
    fn test_identifier_safety() {
        assert!(is_identifier_safe("get_current_time"));
        assert!(is_identifier_safe("check_node_health2"));
        assert!(!is_identifier_safe("2fast"));
        assert!(!is_identifier_safe("get pods"));
        assert!(!is_identifier_safe(""));
    }

    #[test]
    fn test_argument_helpers() {
        let args = domain::models::normalize_arguments(json!({
            "lines": 50.0,
            "limit": "7",
            "namespace": "  ",
            "app_name": "guestbook"
        }));
        assert_eq!(int_arg(&args, "lines"), Some(50));
        assert_eq!(int_arg(&args, "limit"), Some(7));
        assert_eq!(str_arg(&args, "namespace"), None);
        assert_eq!(required_str(&args, "app_name").unwrap(), "guestbook");
        assert!(required_str(&args, "pod_name").is_err());
    }
}
