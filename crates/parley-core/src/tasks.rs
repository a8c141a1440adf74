//! Per-chat task list ("orbit").
//!
//! Tasks are JSON records appended to the list at `tasks:<chat_id>`. The
//! list has no expiry; it lives until the user clears it.

use std::sync::Arc;

use tracing::warn;

use parley_types::chat::ChatId;
use parley_types::error::StoreError;
use parley_types::task::Task;

use crate::storage::KvStore;
use crate::storage::keys::tasks_key;

pub struct TaskList<S> {
    store: Arc<S>,
}

impl<S: KvStore> TaskList<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn add(&self, chat_id: ChatId, task: &Task) -> Result<(), StoreError> {
        let raw =
            serde_json::to_string(task).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.list_push(&tasks_key(chat_id), &raw).await?;
        Ok(())
    }

    /// All tasks in insertion order. Undecodable entries are skipped.
    pub async fn list(&self, chat_id: ChatId) -> Result<Vec<Task>, StoreError> {
        let entries = self.store.list_all(&tasks_key(chat_id)).await?;
        let tasks = entries
            .iter()
            .filter_map(|raw| match serde_json::from_str::<Task>(raw) {
                Ok(task) => Some(task),
                Err(e) => {
                    warn!(chat_id = %chat_id, error = %e, "skipping corrupt task entry");
                    None
                }
            })
            .collect();
        Ok(tasks)
    }

    pub async fn clear(&self, chat_id: ChatId) -> Result<(), StoreError> {
        self.store.delete(&tasks_key(chat_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKvStore;

    #[tokio::test]
    async fn test_add_list_clear() {
        let store = Arc::new(MemoryKvStore::new());
        let tasks = TaskList::new(store.clone());
        let chat = ChatId(9);

        tasks.add(chat, &Task::new("stretch", "07:00")).await.unwrap();
        tasks.add(chat, &Task::new("standup", "09:30")).await.unwrap();

        let listed = tasks.list(chat).await.unwrap();
        let names: Vec<&str> = listed.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(names, vec!["stretch", "standup"]);
        assert!(tasks.list(ChatId(10)).await.unwrap().is_empty());

        tasks.clear(chat).await.unwrap();
        assert!(tasks.list(chat).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_entries_are_skipped() {
        let store = Arc::new(MemoryKvStore::new());
        store.list_push("tasks:1", "garbage").await.unwrap();
        let tasks = TaskList::new(store);
        tasks.add(ChatId(1), &Task::new("read", "21:00")).await.unwrap();

        let listed = tasks.list(ChatId(1)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].time, "21:00");
    }
}
