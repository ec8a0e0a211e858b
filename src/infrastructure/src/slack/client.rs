use crate::config::SlackConfig;
use async_trait::async_trait;
use domain::services::{ChatTransport, OutgoingMessage};
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::types::MessageTs;
use shared::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

/// Slack Web API client (the handful of methods the bot needs).
#[derive(Clone)]
pub struct SlackClient {
    client: Arc<Client>,
    api_base: String,
    token: Option<String>,
}

impl SlackClient {
    pub fn new(config: &SlackConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client: Arc::new(client),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    /// The bot's own user id, used to ignore its own messages.
    pub async fn auth_test(&self) -> Result<String> {
        let response = self.call("auth.test", json!({})).await?;
        response
            .user_id
            .ok_or_else(|| Error::Transport("auth.test returned no user_id".to_string()))
    }

    async fn call(&self, method: &str, body: Value) -> Result<ApiResponse> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| Error::Configuration("SLACK_TOKEN is not set".to_string()))?;
        let url = format!("{}/{}", self.api_base, method);
        debug!(method = %method, "calling Slack");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let text = response.text().await?;
        parse_response(method, &text)
    }
}

fn parse_response(method: &str, body: &str) -> Result<ApiResponse> {
    let parsed: ApiResponse = serde_json::from_str(body)?;
    if parsed.ok {
        Ok(parsed)
    } else {
        let reason = parsed.error.unwrap_or_else(|| "unknown_error".to_string());
        error!(method = %method, error = %reason, "Slack API call failed");
        Err(Error::Transport(format!("{}: {}", method, reason)))
    }
}

fn message_body(message: &OutgoingMessage) -> Value {
    let mut body = json!({ "channel": message.channel });
    if let Some(text) = &message.text {
        body["text"] = json!(text);
    }
    if let Some(blocks) = &message.blocks {
        body["blocks"] = blocks.clone();
    }
    body
}

#[async_trait]
impl ChatTransport for SlackClient {
    async fn post(&self, message: OutgoingMessage) -> Result<Option<MessageTs>> {
        let response = self.call("chat.postMessage", message_body(&message)).await?;
        Ok(response.ts)
    }

    async fn delete(&self, channel: &str, ts: &str) -> Result<()> {
        self.call("chat.delete", json!({ "channel": channel, "ts": ts }))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_body() {
        let text = message_body(&OutgoingMessage::text("C1", "hello"));
        assert_eq!(text, json!({"channel": "C1", "text": "hello"}));

        let blocks = message_body(&OutgoingMessage::blocks("C1", json!([{"type": "divider"}])));
        assert_eq!(blocks["blocks"][0]["type"], "divider");
        assert!(blocks.get("text").is_none());
    }

    #[test]
    fn test_parse_response() {
        let ok = parse_response("chat.postMessage", r#"{"ok":true,"ts":"1700.01"}"#).unwrap();
        assert_eq!(ok.ts.as_deref(), Some("1700.01"));

        let err = parse_response("chat.delete", r#"{"ok":false,"error":"message_not_found"}"#)
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Transport error: chat.delete: message_not_found");
    }

    #[tokio::test]
    async fn test_missing_token() {
        let client = SlackClient::new(&SlackConfig {
            bot_token: None,
            api_base: "https://slack.com/api".to_string(),
        })
        .unwrap();
        assert!(!client.is_configured());
        let err = client.delete("C1", "1.0").await.unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
