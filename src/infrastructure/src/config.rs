use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are K2SOBot, a Kubernetes assistant in Slack.

Capabilities:
- Kubernetes: Query pods, deployments, services, get logs, describe resources
- ArgoCD: Monitor applications, check sync status, trigger syncs
- Tools: Use available tools when users ask about cluster state

Guidelines:
- Be concise and technical
- Format responses for Slack (use code blocks for outputs)
- Confirm before destructive operations
- Never expose secrets or passwords

When responding:
- For cluster questions → use k8s tools
- For ArgoCD questions → use argo tools
- For time questions → use get_current_time()
- Keep responses focused and helpful";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub system_prompt: String,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub bot_token: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct ArgoCdConfig {
    pub server: String,
    pub username: String,
    pub password: Option<String>,
    pub insecure: bool,
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub history_limit: usize,
    pub max_users: usize,
    pub max_channels: usize,
    pub selection_ttl: Duration,
    pub engine_timeout: Duration,
    pub capability_timeout: Duration,
    pub command_timeout: Duration,
    pub rollback_timeout: Duration,
    pub max_output_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            history_limit: 10,
            max_users: 1000,
            max_channels: 1000,
            selection_ttl: Duration::from_secs(1800),
            engine_timeout: Duration::from_secs(60),
            capability_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(60),
            rollback_timeout: Duration::from_secs(300),
            max_output_chars: 3500,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub slack: SlackConfig,
    pub argocd: ArgoCdConfig,
    pub prometheus_url: String,
    pub bind_addr: SocketAddr,
    pub limits: LimitsConfig,
}

impl Config {
    /// Read `.env` (if any) and the process environment once.
    pub fn load() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset, blank or unparsable values fall back
    /// to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let string_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let secs_or = |key: &str, default: Duration| {
            get(key)
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };
        let count_or = |key: &str, default: usize| {
            get(key)
                .and_then(|s| s.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default)
        };

        let gemini = GeminiConfig {
            api_key: get("GEMINI_API_KEY"),
            model: string_or("GEMINI_MODEL", "gemini-2.5-flash-lite"),
            base_url: string_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            system_prompt: string_or("K2SOBOT_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
        };

        let slack = SlackConfig {
            bot_token: get("SLACK_TOKEN"),
            api_base: string_or("SLACK_API_BASE", "https://slack.com/api"),
        };

        let argocd = ArgoCdConfig {
            server: string_or("ARGOCD_SERVER", "argocd-server.argo.svc.cluster.local:80"),
            username: string_or("ARGOCD_USERNAME", "admin"),
            password: get("ARGOCD_PASSWORD"),
            insecure: get("ARGOCD_INSECURE")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(true),
        };

        let defaults = LimitsConfig::default();
        let limits = LimitsConfig {
            history_limit: count_or("K2SOBOT_HISTORY_LIMIT", defaults.history_limit),
            max_users: count_or("K2SOBOT_MAX_USERS", defaults.max_users),
            max_channels: count_or("K2SOBOT_MAX_CHANNELS", defaults.max_channels),
            selection_ttl: secs_or("K2SOBOT_SELECTION_TTL_SECS", defaults.selection_ttl),
            engine_timeout: secs_or("K2SOBOT_ENGINE_TIMEOUT_SECS", defaults.engine_timeout),
            capability_timeout: secs_or(
                "K2SOBOT_CAPABILITY_TIMEOUT_SECS",
                defaults.capability_timeout,
            ),
            command_timeout: secs_or("K2SOBOT_COMMAND_TIMEOUT_SECS", defaults.command_timeout),
            rollback_timeout: secs_or("K2SOBOT_ROLLBACK_TIMEOUT_SECS", defaults.rollback_timeout),
            max_output_chars: count_or("K2SOBOT_MAX_OUTPUT_CHARS", defaults.max_output_chars),
        };

        let bind_addr = get("K2SOBOT_BIND")
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        Self {
            gemini,
            slack,
            argocd,
            prometheus_url: string_or("PROMETHEUS_URL", "http://localhost:9090"),
            bind_addr,
            limits,
        }
    }

    pub fn gemini_available(&self) -> bool {
        self.gemini.api_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.gemini_available());
        assert_eq!(config.gemini.model, "gemini-2.5-flash-lite");
        assert_eq!(config.argocd.server, "argocd-server.argo.svc.cluster.local:80");
        assert!(config.argocd.insecure);
        assert_eq!(config.prometheus_url, "http://localhost:9090");
        assert_eq!(config.limits.history_limit, 10);
        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let config = config_from(&[("GEMINI_API_KEY", "   ")]);
        assert!(!config.gemini_available());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "abc"),
            ("ARGOCD_INSECURE", "false"),
            ("K2SOBOT_ROLLBACK_TIMEOUT_SECS", "12"),
            ("K2SOBOT_BIND", "127.0.0.1:8080"),
            ("K2SOBOT_HISTORY_LIMIT", "0"),
        ]);
        assert!(config.gemini_available());
        assert!(!config.argocd.insecure);
        assert_eq!(config.limits.rollback_timeout, Duration::from_secs(12));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        // zero is rejected, the default stays
        assert_eq!(config.limits.history_limit, 10);
    }
}
