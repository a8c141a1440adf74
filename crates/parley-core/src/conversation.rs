//! Per-chat conversation history with sliding expiry.
//!
//! History is a JSON array of turns under `conversation:<chat_id>`. Every
//! read and every write resets the inactivity timer, so a chat that goes
//! quiet for the whole timeout forgets its history.
//!
//! `append` is a read-modify-write against the shared store without a
//! transaction. Two concurrent appends for the same chat can lose one
//! update; the rate limiter keeps that window small in practice.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use parley_types::chat::{ChatId, Turn};
use parley_types::error::StoreError;

use crate::storage::KvStore;
use crate::storage::keys::conversation_key;

pub struct ConversationStore<S> {
    store: Arc<S>,
    max_turns: usize,
    inactivity_timeout: Duration,
}

impl<S: KvStore> ConversationStore<S> {
    pub fn new(store: Arc<S>, max_turns: usize, inactivity_timeout: Duration) -> Self {
        Self {
            store,
            max_turns,
            inactivity_timeout,
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Load the chat's history, oldest first, and refresh its expiry.
    ///
    /// Missing, unreadable or corrupt history is treated as empty.
    pub async fn get(&self, chat_id: ChatId) -> Vec<Turn> {
        let key = conversation_key(chat_id);
        let raw = match self.store.get_refresh(&key, self.inactivity_timeout).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "failed to load history, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Turn>>(&raw) {
            Ok(turns) => turns,
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "discarding corrupt history");
                Vec::new()
            }
        }
    }

    /// Replace the chat's history, keeping only the newest `max_turns` turns.
    pub async fn save(&self, chat_id: ChatId, turns: &[Turn]) -> Result<(), StoreError> {
        let kept = &turns[turns.len().saturating_sub(self.max_turns)..];
        let raw =
            serde_json::to_string(kept).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store
            .set_ex(&conversation_key(chat_id), &raw, self.inactivity_timeout)
            .await
    }

    /// Add one turn to the end of the chat's history.
    pub async fn append(&self, chat_id: ChatId, turn: Turn) -> Result<(), StoreError> {
        let mut turns = self.get(chat_id).await;
        turns.push(turn);
        self.save(chat_id, &turns).await
    }

    /// Forget the chat's history.
    pub async fn clear(&self, chat_id: ChatId) -> Result<(), StoreError> {
        self.store.delete(&conversation_key(chat_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;
    use crate::testing::FailingKvStore;

    const TIMEOUT: Duration = Duration::from_secs(1800);

    fn conversations(max_turns: usize) -> (Arc<MemoryKvStore>, ConversationStore<MemoryKvStore>) {
        let store = Arc::new(MemoryKvStore::new());
        let conversations = ConversationStore::new(store.clone(), max_turns, TIMEOUT);
        (store, conversations)
    }

    #[tokio::test]
    async fn test_get_missing_history_is_empty() {
        let (_, conversations) = conversations(20);
        assert!(conversations.get(ChatId(1)).await.is_empty());
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let (_, conversations) = conversations(20);
        let chat = ChatId(1);
        conversations.append(chat, Turn::user("hi")).await.unwrap();
        conversations.append(chat, Turn::assistant("hello")).await.unwrap();
        assert_eq!(
            conversations.get(chat).await,
            vec![Turn::user("hi"), Turn::assistant("hello")]
        );
    }

    #[tokio::test]
    async fn test_save_keeps_newest_turns() {
        let (_, conversations) = conversations(20);
        let chat = ChatId(1);
        let turns: Vec<Turn> = (0..25).map(|i| Turn::user(format!("m{i}"))).collect();
        conversations.save(chat, &turns).await.unwrap();

        let stored = conversations.get(chat).await;
        assert_eq!(stored.len(), 20);
        assert_eq!(stored.first().unwrap().content, "m5");
        assert_eq!(stored.last().unwrap().content, "m24");
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_expires_after_inactivity() {
        let (_, conversations) = conversations(20);
        let chat = ChatId(1);
        conversations.append(chat, Turn::user("hi")).await.unwrap();

        tokio::time::advance(TIMEOUT + Duration::from_secs(1)).await;
        assert!(conversations.get(chat).await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_refreshes_expiry() {
        let (store, conversations) = conversations(20);
        let chat = ChatId(1);
        conversations.append(chat, Turn::user("hi")).await.unwrap();

        tokio::time::advance(Duration::from_secs(1700)).await;
        assert_eq!(conversations.get(chat).await.len(), 1);
        assert_eq!(store.ttl("conversation:1"), Some(TIMEOUT));

        tokio::time::advance(Duration::from_secs(1700)).await;
        assert_eq!(conversations.get(chat).await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_removes_history() {
        let (_, conversations) = conversations(20);
        let chat = ChatId(1);
        conversations.append(chat, Turn::user("hi")).await.unwrap();
        conversations.clear(chat).await.unwrap();
        assert!(conversations.get(chat).await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_history_reads_as_empty() {
        let (store, conversations) = conversations(20);
        store
            .set_ex("conversation:1", "{not json", TIMEOUT)
            .await
            .unwrap();
        assert!(conversations.get(ChatId(1)).await.is_empty());

        // The next append overwrites the corrupt value.
        conversations.append(ChatId(1), Turn::user("hi")).await.unwrap();
        assert_eq!(conversations.get(ChatId(1)).await, vec![Turn::user("hi")]);
    }

    #[tokio::test]
    async fn test_store_failure_reads_as_empty_and_write_errors() {
        let conversations = ConversationStore::new(Arc::new(FailingKvStore), 20, TIMEOUT);
        assert!(conversations.get(ChatId(1)).await.is_empty());
        assert!(conversations.append(ChatId(1), Turn::user("hi")).await.is_err());
    }

    #[tokio::test]
    async fn test_interleaved_appends_lose_an_update() {
        let (_, conversations) = conversations(20);
        let chat = ChatId(1);

        // Two handlers read the same snapshot before either writes.
        let mut first = conversations.get(chat).await;
        let mut second = conversations.get(chat).await;
        first.push(Turn::user("from first"));
        second.push(Turn::user("from second"));
        conversations.save(chat, &first).await.unwrap();
        conversations.save(chat, &second).await.unwrap();

        assert_eq!(conversations.get(chat).await, vec![Turn::user("from second")]);
    }
}
