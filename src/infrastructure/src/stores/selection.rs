use async_trait::async_trait;
use domain::entities::SelectionState;
use domain::services::{SelectionStore, SelectionUpdate};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct SelectionEntry {
    state: SelectionState,
    touched_at: Instant,
}

/// Wizard state per channel, bounded by entry count and idle time.
pub struct InMemorySelectionStore {
    entries: Mutex<LruCache<String, SelectionEntry>>,
    ttl: Duration,
}

impl InMemorySelectionStore {
    pub fn new(max_channels: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_channels).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Drop entries idle for longer than the TTL.
    pub async fn prune_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, e)| now.duration_since(e.touched_at) >= self.ttl)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }

    fn is_live(&self, entry: &SelectionEntry) -> bool {
        entry.touched_at.elapsed() < self.ttl
    }
}

#[async_trait]
impl SelectionStore for InMemorySelectionStore {
    async fn get(&self, channel_id: &str) -> Option<SelectionState> {
        let mut entries = self.entries.lock().await;
        match entries.get(channel_id) {
            Some(entry) if self.is_live(entry) => Some(entry.state.clone()),
            Some(_) => {
                entries.pop(channel_id);
                None
            }
            None => None,
        }
    }

    async fn put(&self, channel_id: &str, state: SelectionState) {
        let mut entries = self.entries.lock().await;
        entries.put(
            channel_id.to_string(),
            SelectionEntry {
                state,
                touched_at: Instant::now(),
            },
        );
    }

    async fn update(&self, channel_id: &str, update: SelectionUpdate) -> Option<SelectionState> {
        let mut entries = self.entries.lock().await;
        let live = entries.get(channel_id).map(|e| self.is_live(e))?;
        if !live {
            entries.pop(channel_id);
            return None;
        }
        let entry = entries.get_mut(channel_id)?;
        let mut next = entry.state.clone();
        if !update(&mut next) {
            return None;
        }
        entry.state = next;
        entry.touched_at = Instant::now();
        Some(entry.state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::entities::WizardCommand;

    #[tokio::test]
    async fn test_put_get_update() {
        let store = InMemorySelectionStore::new(10, Duration::from_secs(60));
        assert!(store.get("C1").await.is_none());

        store
            .put("C1", SelectionState::with_command(WizardCommand::Get))
            .await;
        let updated = store
            .update(
                "C1",
                Box::new(|s| {
                    s.sub_command = Some("pods".to_string());
                    true
                }),
            )
            .await
            .unwrap();
        assert_eq!(updated.sub_command(), Some("pods"));
        assert_eq!(store.get("C1").await, Some(updated));
    }

    #[tokio::test]
    async fn test_update_without_entry_is_none() {
        let store = InMemorySelectionStore::new(10, Duration::from_secs(60));
        let result = store
            .update(
                "C9",
                Box::new(|s| {
                    s.scope = Some("default".to_string());
                    true
                }),
            )
            .await;
        assert!(result.is_none());
        assert!(store.get("C9").await.is_none());
    }

    #[tokio::test]
    async fn test_declined_update_leaves_entry_untouched() {
        let store = InMemorySelectionStore::new(10, Duration::from_secs(60));
        store
            .put("C1", SelectionState::with_command(WizardCommand::Get))
            .await;

        let result = store
            .update(
                "C1",
                Box::new(|s| {
                    s.scope = Some("default".to_string());
                    false
                }),
            )
            .await;
        assert!(result.is_none());
        assert_eq!(
            store.get("C1").await,
            Some(SelectionState::with_command(WizardCommand::Get))
        );
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = InMemorySelectionStore::new(10, Duration::from_millis(20));
        store
            .put("C1", SelectionState::with_command(WizardCommand::Argo))
            .await;
        store
            .put("C2", SelectionState::with_command(WizardCommand::Logs))
            .await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(store.get("C1").await.is_none());
        assert_eq!(store.prune_expired().await, 1);
    }

    #[tokio::test]
    async fn test_channel_capacity() {
        let store = InMemorySelectionStore::new(1, Duration::from_secs(60));
        store
            .put("C1", SelectionState::with_command(WizardCommand::Get))
            .await;
        store
            .put("C2", SelectionState::with_command(WizardCommand::Describe))
            .await;
        assert!(store.get("C1").await.is_none());
        assert!(store.get("C2").await.is_some());
    }
}
