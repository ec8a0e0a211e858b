//! In-memory doubles for the engine, the transport and the command runner.

use async_trait::async_trait;
use domain::models::{EngineReply, EngineRequest};
use domain::services::{ChatTransport, CommandOutput, CommandRunner, OutgoingMessage, ReasoningEngine};
use shared::types::MessageTs;
use shared::{Error, Result};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Answers from a queue of canned replies and keeps every request it saw.
pub struct ScriptedEngine {
    configured: bool,
    replies: Mutex<VecDeque<Result<EngineReply>>>,
    requests: Mutex<Vec<EngineRequest>>,
    delay: Duration,
}

impl ScriptedEngine {
    pub fn new(replies: Vec<Result<EngineReply>>) -> Self {
        Self {
            configured: true,
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(Vec::new())
        }
    }

    pub fn requests(&self) -> Vec<EngineRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    fn is_configured(&self) -> bool {
        self.configured
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &EngineRequest) -> Result<EngineReply> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(EngineReply::default()))
    }
}

/// Keeps every posted message; deletes can be made to fail.
#[derive(Default)]
pub struct RecordingTransport {
    pub posts: Mutex<Vec<OutgoingMessage>>,
    pub deletes: Mutex<Vec<(String, String)>>,
    pub fail_deletes: bool,
}

impl RecordingTransport {
    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<OutgoingMessage> {
        self.posts.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.posts()
            .into_iter()
            .filter_map(|m| m.text)
            .collect()
    }

    /// Action id of every menu posted, in order.
    pub fn menus(&self) -> Vec<String> {
        self.posts()
            .into_iter()
            .filter_map(|m| m.blocks)
            .filter_map(|b| b[1]["elements"][0]["action_id"].as_str().map(str::to_string))
            .collect()
    }

    pub fn deletes(&self) -> Vec<(String, String)> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn post(&self, message: OutgoingMessage) -> Result<Option<MessageTs>> {
        let mut posts = self.posts.lock().unwrap();
        posts.push(message);
        Ok(Some(format!("1700000000.{:06}", posts.len())))
    }

    async fn delete(&self, channel: &str, ts: &str) -> Result<()> {
        self.deletes
            .lock()
            .unwrap()
            .push((channel.to_string(), ts.to_string()));
        if self.fail_deletes {
            Err(Error::Transport("chat.delete: message_not_found".to_string()))
        } else {
            Ok(())
        }
    }
}

type Responder = Box<dyn Fn(&[String]) -> Result<CommandOutput> + Send + Sync>;

/// Records command lines (program first) and answers from a closure.
pub struct FakeRunner {
    calls: Mutex<Vec<Vec<String>>>,
    responder: Responder,
    slow: Option<(&'static str, Duration)>,
}

impl FakeRunner {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[String]) -> Result<CommandOutput> + Send + Sync + 'static,
    {
        Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
            slow: None,
        }
    }

    /// Commands whose line contains `needle` take `delay` before answering.
    pub fn with_delay(mut self, needle: &'static str, delay: Duration) -> Self {
        self.slow = Some((needle, delay));
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls other than the argocd session check.
    pub fn work_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|line| line.join(" "))
            .filter(|line| line != "argocd account get-user-info")
            .collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[String], _timeout: Duration) -> Result<CommandOutput> {
        let mut line = vec![program.to_string()];
        line.extend(args.iter().cloned());
        self.calls.lock().unwrap().push(line.clone());
        if let Some((needle, delay)) = self.slow {
            if line.join(" ").contains(needle) {
                tokio::time::sleep(delay).await;
            }
        }
        (self.responder)(&line)
    }
}
