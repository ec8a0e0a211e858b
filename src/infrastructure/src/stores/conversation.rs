use async_trait::async_trait;
use domain::entities::{ConversationTurn, Role};
use domain::services::ConversationStore;
use lru::LruCache;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use tokio::sync::Mutex;

/// Per-user turn windows. Each window keeps the newest `history_limit` turns;
/// the least recently active user is dropped once `max_users` is exceeded.
pub struct InMemoryConversationStore {
    histories: Mutex<LruCache<String, VecDeque<ConversationTurn>>>,
    history_limit: usize,
}

impl InMemoryConversationStore {
    pub fn new(history_limit: usize, max_users: usize) -> Self {
        let capacity = NonZeroUsize::new(max_users).unwrap_or(NonZeroUsize::MIN);
        Self {
            histories: Mutex::new(LruCache::new(capacity)),
            history_limit: history_limit.max(1),
        }
    }

    fn push(&self, window: &mut VecDeque<ConversationTurn>, turn: ConversationTurn) {
        window.push_back(turn);
        while window.len() > self.history_limit {
            window.pop_front();
        }
    }

    pub async fn user_count(&self) -> usize {
        self.histories.lock().await.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, user_id: &str, role: Role, content: &str) {
        let mut histories = self.histories.lock().await;
        let window = histories.get_or_insert_mut(user_id.to_string(), VecDeque::new);
        self.push(window, ConversationTurn::new(role, content));
    }

    async fn append_exchange(&self, user_id: &str, user_text: &str, model_text: &str) {
        let mut histories = self.histories.lock().await;
        let window = histories.get_or_insert_mut(user_id.to_string(), VecDeque::new);
        self.push(window, ConversationTurn::user(user_text));
        self.push(window, ConversationTurn::model(model_text));
    }

    async fn history(&self, user_id: &str) -> Vec<ConversationTurn> {
        let mut histories = self.histories.lock().await;
        histories
            .get(user_id)
            .map(|w| w.iter().cloned().collect())
            .unwrap_or_default()
    }
}
