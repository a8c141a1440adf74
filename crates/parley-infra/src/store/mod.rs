//! Key-value store backends.
//!
//! [`ConfiguredStore`] picks Redis or the process-local map at startup
//! from [`StoreConfig`], so the rest of the application is written against
//! one concrete type.

pub mod redis;

use std::time::Duration;

use parley_core::storage::{KvStore, MemoryKvStore};
use parley_types::config::{StoreBackend, StoreConfig};
use parley_types::error::StoreError;

use self::redis::RedisKvStore;

/// The store selected by configuration.
pub enum ConfiguredStore {
    Redis(RedisKvStore),
    Memory(MemoryKvStore),
}

impl ConfiguredStore {
    /// Connect to the configured backend.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        match config.backend {
            StoreBackend::Redis => Ok(Self::Redis(RedisKvStore::connect(&config.redis_url).await?)),
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; state is lost on restart and not shared");
                Ok(Self::Memory(MemoryKvStore::new()))
            }
        }
    }

    pub fn backend(&self) -> StoreBackend {
        match self {
            Self::Redis(_) => StoreBackend::Redis,
            Self::Memory(_) => StoreBackend::Memory,
        }
    }
}

impl KvStore for ConfiguredStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Self::Redis(store) => store.get(key).await,
            Self::Memory(store) => store.get(key).await,
        }
    }

    async fn get_refresh(&self, key: &str, ttl: Duration) -> Result<Option<String>, StoreError> {
        match self {
            Self::Redis(store) => store.get_refresh(key, ttl).await,
            Self::Memory(store) => store.get_refresh(key, ttl).await,
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        match self {
            Self::Redis(store) => store.set_ex(key, value, ttl).await,
            Self::Memory(store) => store.set_ex(key, value, ttl).await,
        }
    }

    async fn incr_with_expiry(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        match self {
            Self::Redis(store) => store.incr_with_expiry(key, window).await,
            Self::Memory(store) => store.incr_with_expiry(key, window).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Self::Redis(store) => store.delete(key).await,
            Self::Memory(store) => store.delete(key).await,
        }
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        match self {
            Self::Redis(store) => store.list_push(key, value).await,
            Self::Memory(store) => store.list_push(key, value).await,
        }
    }

    async fn list_all(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Redis(store) => store.list_all(key).await,
            Self::Memory(store) => store.list_all(key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_delegates() {
        let config = StoreConfig {
            backend: StoreBackend::Memory,
            ..StoreConfig::default()
        };
        let store = ConfiguredStore::connect(&config).await.unwrap();
        assert_eq!(store.backend(), StoreBackend::Memory);

        assert_eq!(store.incr_with_expiry("c", Duration::from_secs(5)).await.unwrap(), 1);
        store.set_ex("k", "v", Duration::from_secs(5)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_bad_redis_url_is_connection_error() {
        let config = StoreConfig {
            backend: StoreBackend::Redis,
            redis_url: "not-a-url".to_string(),
        };
        let result = ConfiguredStore::connect(&config).await;
        assert!(matches!(result, Err(StoreError::Connection(_))));
    }
}
