//! Process-local [`KvStore`] backed by a `DashMap`.
//!
//! Expiry is evaluated lazily against `tokio::time::Instant`, so tests can
//! drive it with a paused clock. Counter increments take the map's shard
//! lock for the whole read-modify-write, which keeps them atomic.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use parley_types::error::StoreError;

use super::kv_store::KvStore;

#[derive(Debug, Clone)]
enum Value {
    Text(String),
    List(Vec<String>),
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn fresh(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-memory store. Cloning is not supported; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: DashMap<String, Slot>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining time-to-live of a live key, `None` if absent or persistent.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let slot = self.entries.get(key)?;
        match slot.expires_at {
            Some(at) if at > now => Some(at - now),
            _ => None,
        }
    }

    fn purge_expired(&self, key: &str, now: Instant) {
        self.entries.remove_if(key, |_, slot| !slot.is_live(now));
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::WrongType(key.to_string())
}

impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        self.purge_expired(key, now);
        match self.entries.get(key) {
            None => Ok(None),
            Some(slot) => match &slot.value {
                Value::Text(text) => Ok(Some(text.clone())),
                Value::List(_) => Err(wrong_type(key)),
            },
        }
    }

    async fn get_refresh(&self, key: &str, ttl: Duration) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        self.purge_expired(key, now);
        match self.entries.get_mut(key) {
            None => Ok(None),
            Some(mut slot) => {
                let text = match &slot.value {
                    Value::Text(text) => text.clone(),
                    Value::List(_) => return Err(wrong_type(key)),
                };
                slot.expires_at = Some(now + ttl);
                Ok(Some(text))
            }
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let slot = Slot {
            value: Value::Text(value.to_string()),
            expires_at: Some(Instant::now() + ttl),
        };
        self.entries.insert(key.to_string(), slot);
        Ok(())
    }

    async fn incr_with_expiry(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Slot::fresh(Value::Text("0".to_string())));
        if !slot.is_live(now) {
            *slot = Slot::fresh(Value::Text("0".to_string()));
        }

        let current: u64 = match &slot.value {
            Value::Text(text) => text.parse().map_err(|_| wrong_type(key))?,
            Value::List(_) => return Err(wrong_type(key)),
        };
        let next = current + 1;
        slot.value = Value::Text(next.to_string());
        if next == 1 {
            slot.expires_at = Some(now + window);
        }
        Ok(next)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Slot::fresh(Value::List(Vec::new())));
        if !slot.is_live(now) {
            *slot = Slot::fresh(Value::List(Vec::new()));
        }
        match &mut slot.value {
            Value::List(items) => {
                items.push(value.to_string());
                Ok(items.len() as u64)
            }
            Value::Text(_) => Err(wrong_type(key)),
        }
    }

    async fn list_all(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let now = Instant::now();
        self.purge_expired(key, now);
        match self.entries.get(key) {
            None => Ok(Vec::new()),
            Some(slot) => match &slot.value {
                Value::List(items) => Ok(items.clone()),
                Value::Text(_) => Err(wrong_type(key)),
            },
        }
    }
}
