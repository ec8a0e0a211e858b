use crate::chat_service::ChatService;
use crate::wizard_service::WizardService;
use domain::entities::{InboundEvent, WizardStep};
use domain::services::{ChatTransport, OutgoingMessage};
use shared::types::UserId;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const THINKING: &str = "🤔 Thinking...";
pub const CHAT_UNAVAILABLE: &str =
    "Sorry, Gemini AI is not configured. Please contact the administrator.";

/// Routes inbound events to the chat loop or the wizard, each on its own task.
pub struct EventDispatcher {
    chat: Arc<ChatService>,
    wizard: Arc<WizardService>,
    transport: Arc<dyn ChatTransport>,
    bot_user_id: Option<UserId>,
}

impl EventDispatcher {
    pub fn new(
        chat: Arc<ChatService>,
        wizard: Arc<WizardService>,
        transport: Arc<dyn ChatTransport>,
        bot_user_id: Option<UserId>,
    ) -> Self {
        Self {
            chat,
            wizard,
            transport,
            bot_user_id,
        }
    }

    pub fn wizard(&self) -> &WizardService {
        &self.wizard
    }

    /// Handle `event` on a detached task so the caller can acknowledge at once.
    pub fn dispatch(self: &Arc<Self>, event: InboundEvent) -> JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.handle(event).await })
    }

    pub async fn handle(&self, event: InboundEvent) {
        debug!(kind = event.kind(), channel = %event.channel(), "handling inbound event");
        match &event {
            InboundEvent::Mention { channel, user } | InboundEvent::SlashCommand { channel, user } => {
                if let Err(e) = self.wizard.start(channel, user).await {
                    error!(channel = %channel, error = %e, "could not post command menu");
                }
            }
            InboundEvent::Message { channel, .. } => {
                match event.direct_message_text(self.bot_user_id.as_deref()) {
                    Some((user, text)) => self.answer_direct_message(channel, user, text).await,
                    None => debug!(channel = %channel, "ignoring message"),
                }
            }
            InboundEvent::Selection {
                channel,
                action_id,
                value,
                ..
            } => match WizardStep::from_action_id(action_id) {
                Some(step) => self.wizard.handle_selection(channel, step, value).await,
                None => warn!(channel = %channel, action_id = %action_id, "unknown action id"),
            },
        }
    }

    async fn answer_direct_message(&self, channel: &str, user: &str, text: &str) {
        if !self.chat.is_available() {
            self.post(channel, CHAT_UNAVAILABLE).await;
            return;
        }

        let thinking = match self
            .transport
            .post(OutgoingMessage::text(channel, THINKING))
            .await
        {
            Ok(ts) => ts,
            Err(e) => {
                warn!(channel = %channel, error = %e, "could not post thinking message");
                None
            }
        };

        let reply = self.chat.chat(user, text).await;

        if let Some(ts) = thinking {
            if let Err(e) = self.transport.delete(channel, &ts).await {
                debug!(channel = %channel, error = %e, "could not delete thinking message");
            }
        }
        self.post(channel, reply).await;
        info!(channel = %channel, user_id = %user, "answered direct message");
    }

    async fn post(&self, channel: &str, text: impl Into<String>) {
        if let Err(e) = self.transport.post(OutgoingMessage::text(channel, text)).await {
            error!(channel = %channel, error = %e, "could not post reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeRunner, RecordingTransport, ScriptedEngine};
    use domain::models::EngineReply;
    use domain::services::{CommandOutput, ConversationStore};
    use infrastructure::argocd::ArgoCdClient;
    use infrastructure::config::Config;
    use infrastructure::kubectl::KubectlClient;
    use infrastructure::stores::{InMemoryConversationStore, InMemorySelectionStore};
    use infrastructure::tools::CapabilityRegistry;
    use std::time::Duration;

    struct Fixture {
        transport: Arc<RecordingTransport>,
        store: Arc<InMemoryConversationStore>,
        dispatcher: Arc<EventDispatcher>,
    }

    fn fixture(engine: ScriptedEngine, transport: RecordingTransport) -> Fixture {
        let transport = Arc::new(transport);
        let store = Arc::new(InMemoryConversationStore::new(10, 100));
        let runner = Arc::new(FakeRunner::new(|_| Ok(CommandOutput::ok("default"))));
        let chat = ChatService::new(
            Arc::new(engine),
            Arc::new(CapabilityRegistry::new(Duration::from_secs(5))),
            store.clone(),
            "prompt",
            Duration::from_secs(5),
        );
        let wizard = WizardService::new(
            Arc::new(InMemorySelectionStore::new(10, Duration::from_secs(60))),
            transport.clone(),
            KubectlClient::new(runner.clone(), Duration::from_secs(5)),
            ArgoCdClient::new(runner, Config::default().argocd, Duration::from_secs(5)),
            3500,
            Duration::from_secs(5),
        );
        let dispatcher = Arc::new(EventDispatcher::new(
            Arc::new(chat),
            Arc::new(wizard),
            transport.clone(),
            Some("UBOT".to_string()),
        ));
        Fixture {
            transport,
            store,
            dispatcher,
        }
    }

    fn dm(user: &str, text: &str) -> InboundEvent {
        InboundEvent::Message {
            channel: "D42".to_string(),
            user: Some(user.to_string()),
            text: text.to_string(),
            subtype: None,
            bot_id: None,
        }
    }

    #[tokio::test]
    async fn test_direct_message_round_trip() {
        let f = fixture(
            ScriptedEngine::new(vec![Ok(EngineReply::text("Hi! How can I help?"))]),
            RecordingTransport::default(),
        );
        f.dispatcher.dispatch(dm("U1", "hello")).await.unwrap();

        assert_eq!(f.transport.texts(), vec![THINKING, "Hi! How can I help?"]);
        assert_eq!(
            f.transport.deletes(),
            vec![("D42".to_string(), "1700000000.000001".to_string())]
        );
        assert_eq!(f.store.history("U1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_delete_still_answers() {
        let f = fixture(
            ScriptedEngine::new(vec![Ok(EngineReply::text("answer"))]),
            RecordingTransport::failing_deletes(),
        );
        f.dispatcher.handle(dm("U1", "question")).await;
        assert_eq!(f.transport.texts().last().unwrap(), "answer");
    }

    #[tokio::test]
    async fn test_own_messages_are_ignored() {
        let f = fixture(ScriptedEngine::new(vec![]), RecordingTransport::default());
        f.dispatcher.handle(dm("UBOT", "echo")).await;
        assert!(f.transport.posts().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_engine_skips_thinking() {
        let f = fixture(ScriptedEngine::unconfigured(), RecordingTransport::default());
        f.dispatcher.handle(dm("U1", "hello")).await;
        assert_eq!(f.transport.texts(), vec![CHAT_UNAVAILABLE]);
        assert!(f.store.history("U1").await.is_empty());
    }

    #[tokio::test]
    async fn test_mention_posts_command_menu() {
        let f = fixture(ScriptedEngine::new(vec![]), RecordingTransport::default());
        f.dispatcher
            .handle(InboundEvent::Mention {
                channel: "C1".to_string(),
                user: "U1".to_string(),
            })
            .await;
        assert_eq!(f.transport.menus(), vec!["kubectl_command_select"]);
    }

    #[tokio::test]
    async fn test_selection_is_routed_to_wizard() {
        let f = fixture(ScriptedEngine::new(vec![]), RecordingTransport::default());
        f.dispatcher
            .handle(InboundEvent::Selection {
                channel: "C1".to_string(),
                user: Some("U1".to_string()),
                action_id: "kubectl_command_select".to_string(),
                value: "get".to_string(),
            })
            .await;
        f.dispatcher
            .handle(InboundEvent::Selection {
                channel: "C1".to_string(),
                user: None,
                action_id: "no_such_action".to_string(),
                value: "x".to_string(),
            })
            .await;
        assert_eq!(f.transport.menus(), vec!["kubectl_sub_command_select"]);
        assert_eq!(f.transport.posts().len(), 1);
    }
}
