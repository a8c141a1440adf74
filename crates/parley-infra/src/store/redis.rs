//! Redis-backed [`KvStore`].
//!
//! Uses a [`ConnectionManager`], which reconnects transparently after a
//! dropped connection; each call clones the manager handle. The windowed
//! counter runs as a Lua script so the increment and the first-hit expiry
//! happen atomically on the server.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{RedisError, Script};

use parley_core::storage::KvStore;
use parley_core::storage::kv_store::ttl_secs;
use parley_types::error::StoreError;

const INCR_WITH_EXPIRY: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
  redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

pub struct RedisKvStore {
    conn: ConnectionManager,
    incr_script: Script,
}

impl RedisKvStore {
    /// Open a managed connection to `url` (e.g. `redis://localhost:6379`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        tracing::info!("connected to redis");
        Ok(Self {
            conn,
            incr_script: Script::new(INCR_WITH_EXPIRY),
        })
    }
}

fn map_redis_error(err: RedisError) -> StoreError {
    if err.code() == Some("WRONGTYPE") {
        StoreError::WrongType(err.to_string())
    } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
        StoreError::Connection(err.to_string())
    } else {
        StoreError::Command(err.to_string())
    }
}

impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(value)
    }

    async fn get_refresh(&self, key: &str, ttl: Duration) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GETEX")
            .arg(key)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    async fn incr_with_expiry(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let count: u64 = self
            .incr_script
            .key(key)
            .arg(ttl_secs(window))
            .invoke_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(count)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let len: u64 = redis::cmd("RPUSH")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(len)
    }

    async fn list_all(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        let items: Vec<String> = redis::cmd("LRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis::ErrorKind;

    #[test]
    fn test_io_errors_map_to_connection() {
        let err = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(map_redis_error(err), StoreError::Connection(_)));
    }

    #[test]
    fn test_other_errors_map_to_command() {
        let err = RedisError::from((ErrorKind::TypeError, "unexpected reply"));
        assert!(matches!(map_redis_error(err), StoreError::Command(_)));
    }

    /// Runs against a real server: `REDIS_URL=redis://localhost:6379 cargo test -- --ignored`.
    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_round_trip_against_live_redis() {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());
        let store = RedisKvStore::connect(&url).await.unwrap();
        let key = "parley:test:counter";
        store.delete(key).await.unwrap();

        assert_eq!(store.incr_with_expiry(key, Duration::from_secs(60)).await.unwrap(), 1);
        assert_eq!(store.incr_with_expiry(key, Duration::from_secs(60)).await.unwrap(), 2);

        store.set_ex("parley:test:s", "v", Duration::from_secs(60)).await.unwrap();
        assert_eq!(
            store
                .get_refresh("parley:test:s", Duration::from_secs(60))
                .await
                .unwrap()
                .as_deref(),
            Some("v")
        );
        assert!(store.list_push("parley:test:s", "x").await.is_err());

        store.delete(key).await.unwrap();
        store.delete("parley:test:s").await.unwrap();
    }
}
