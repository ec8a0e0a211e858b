use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::types::{ChannelId, JsonMap, MessageTs};
use shared::Result;
use std::time::Duration;

use crate::entities::{ConversationTurn, Role, SelectionState};
use crate::models::{EngineReply, EngineRequest, ToolDefinition, ToolParameters};

/// A named, described, invocable unit of external work.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    fn parameters(&self) -> ToolParameters {
        ToolParameters::empty()
    }

    async fn invoke(&self, args: JsonMap) -> anyhow::Result<Value>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// A group of capabilities offered to the registry at discovery time.
pub trait CapabilitySource: Send + Sync {
    fn source_name(&self) -> &str;
    fn capabilities(&self) -> Vec<Box<dyn Capability>>;
}

/// Opaque request/response service that proposes calls or answers in text.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// False when the credential is missing; callers fail fast.
    fn is_configured(&self) -> bool;
    fn model(&self) -> &str;
    async fn generate(&self, request: &EngineRequest) -> Result<EngineReply>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// stdout followed by stderr, the way a terminal would show them.
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, false) => self.stderr.trim_end().to_string(),
            (true, true) => String::new(),
        }
    }
}

/// Runs an external CLI (kubectl, argocd) with an explicit deadline.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], timeout: Duration)
        -> Result<CommandOutput>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub channel: ChannelId,
    pub text: Option<String>,
    pub blocks: Option<Value>,
}

impl OutgoingMessage {
    pub fn text(channel: &str, text: impl Into<String>) -> Self {
        Self {
            channel: channel.to_string(),
            text: Some(text.into()),
            blocks: None,
        }
    }

    pub fn blocks(channel: &str, blocks: Value) -> Self {
        Self {
            channel: channel.to_string(),
            text: None,
            blocks: Some(blocks),
        }
    }
}

/// The messaging platform, as far as the core needs it.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Returns the posted message's timestamp when the platform reports one.
    async fn post(&self, message: OutgoingMessage) -> Result<Option<MessageTs>>;
    async fn delete(&self, channel: &str, ts: &str) -> Result<()>;
}

/// Bounded per-user conversation memory.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append(&self, user_id: &str, role: Role, content: &str);

    /// Append a user turn and the model's answer without letting another
    /// writer for the same user interleave between them.
    async fn append_exchange(&self, user_id: &str, user_text: &str, model_text: &str);

    /// Current window, oldest first; empty for unseen users.
    async fn history(&self, user_id: &str) -> Vec<ConversationTurn>;
}

/// Check-and-write applied to one channel's wizard state.
pub type SelectionUpdate = Box<dyn for<'a> FnOnce(&'a mut SelectionState) -> bool + Send + 'static>;

/// Per-channel wizard state.
#[async_trait]
pub trait SelectionStore: Send + Sync {
    async fn get(&self, channel_id: &str) -> Option<SelectionState>;
    async fn put(&self, channel_id: &str, state: SelectionState);

    /// Run `update` against the live entry under the store's lock. The closure
    /// returns false to leave the entry untouched; `None` then, or when there
    /// is no entry.
    async fn update(&self, channel_id: &str, update: SelectionUpdate) -> Option<SelectionState>;
}
