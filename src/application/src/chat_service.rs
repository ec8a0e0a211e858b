//! Conversational function-calling loop.
//!
//! One turn: send the user's message plus recent history and the capability
//! catalogue to the reasoning engine; if it proposes a call, run the first
//! proposal, hand the normalized result back and return the engine's final
//! answer with a footer naming the capability. Every reply that reaches the
//! user is recorded, except the "not configured" pre-flight answer.

use domain::models::{CapabilityInvocation, EngineMessage, EngineReply, EngineRequest};
use domain::services::{ConversationStore, ReasoningEngine};
use infrastructure::tools::CapabilityRegistry;
use serde_json::Value;
use shared::text::with_tool_footer;
use shared::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

pub const NOT_CONFIGURED: &str =
    "Gemini API key is not configured. Please set GEMINI_API_KEY environment variable.";

pub const NO_ANSWER: &str = "I understand your request but couldn't generate a proper response. Please try rephrasing your question.";

pub struct ChatService {
    engine: Arc<dyn ReasoningEngine>,
    registry: Arc<CapabilityRegistry>,
    conversations: Arc<dyn ConversationStore>,
    system_prompt: String,
    engine_timeout: Duration,
}

impl ChatService {
    pub fn new(
        engine: Arc<dyn ReasoningEngine>,
        registry: Arc<CapabilityRegistry>,
        conversations: Arc<dyn ConversationStore>,
        system_prompt: impl Into<String>,
        engine_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            registry,
            conversations,
            system_prompt: system_prompt.into(),
            engine_timeout,
        }
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_configured()
    }

    /// Answer `message` for `user_id`. Never fails: engine errors become a
    /// chat-safe apology that is recorded like any other answer.
    pub async fn chat(&self, user_id: &str, message: &str) -> String {
        if !self.engine.is_configured() {
            warn!(user_id = %user_id, "reasoning engine is not configured");
            return NOT_CONFIGURED.to_string();
        }

        let reply = match self.converse(user_id, message).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "chat turn failed");
                format!("Sorry, I encountered an error: {}", e.user_message())
            }
        };

        self.conversations
            .append_exchange(user_id, message, &reply)
            .await;
        reply
    }

    async fn converse(&self, user_id: &str, message: &str) -> Result<String> {
        let history = self.conversations.history(user_id).await;
        let mut messages: Vec<EngineMessage> = history.iter().map(EngineMessage::from).collect();
        messages.push(EngineMessage::user_text(message));

        let mut request = EngineRequest {
            system_prompt: self.system_prompt.clone(),
            messages,
            tools: self.registry.definitions(),
        };
        debug!(
            user_id = %user_id,
            history = history.len(),
            tools = request.tools.len(),
            "asking reasoning engine"
        );

        let first = self.generate(&request).await?;
        let calls = first.tool_calls();
        let Some(call) = calls.first() else {
            return Ok(first
                .terminal_text()
                .unwrap_or_else(|| NO_ANSWER.to_string()));
        };
        if calls.len() > 1 {
            warn!(
                proposed = calls.len(),
                "engine proposed several calls, executing only the first"
            );
        }

        info!(user_id = %user_id, capability = %call.name, "engine requested capability");
        let raw = self
            .registry
            .execute(&call.name, call.arguments.clone())
            .await;
        let invocation = CapabilityInvocation::from_result(call, raw);

        request.messages.push(EngineMessage::function_call(call));
        request.messages.push(EngineMessage::function_response(
            &call.name,
            invocation.result.clone(),
        ));

        let answer = match self.generate(&request).await {
            Ok(reply) => reply.terminal_text(),
            Err(e) => {
                warn!(capability = %call.name, error = %e, "no final answer after capability call");
                None
            }
        };

        Ok(match answer {
            Some(text) => with_tool_footer(&text, &invocation.capability_name),
            None => fallback_answer(&invocation),
        })
    }

    async fn generate(&self, request: &EngineRequest) -> Result<EngineReply> {
        match timeout(self.engine_timeout, self.engine.generate(request)).await {
            Ok(reply) => reply,
            Err(_) => Err(Error::Timeout(self.engine_timeout.as_secs())),
        }
    }
}

/// Answer built from the capability result alone when the engine has nothing
/// more to say.
fn fallback_answer(invocation: &CapabilityInvocation) -> String {
    let body = match invocation.result.get("output") {
        Some(Value::String(output)) => output.clone(),
        Some(other) => other.to_string(),
        None => {
            let rendered = serde_json::to_string_pretty(&invocation.result)
                .unwrap_or_else(|_| Value::Object(invocation.result.clone()).to_string());
            format!("Here's the result:\n\n{}", rendered)
        }
    };
    with_tool_footer(&body, &invocation.capability_name)
}
