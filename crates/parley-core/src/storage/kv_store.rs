//! Key-value store trait.
//!
//! Models the small slice of Redis semantics the bot relies on: string
//! values with a time-to-live, a windowed counter and an append-only list.
//! Implementations live in parley-infra (Redis) and in
//! [`super::memory`] (process-local).

use std::future::Future;
use std::time::Duration;

use parley_types::error::StoreError;

/// Trait for the shared key-value store.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition). TTLs are
/// whole seconds on the wire; sub-second durations round up to one second.
pub trait KvStore: Send + Sync {
    /// Get a string value. Returns `None` if the key does not exist or has expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Get a string value and reset its time-to-live in the same operation (`GETEX`).
    fn get_refresh(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Overwrite a key with a value that expires after `ttl` (`SET .. EX`).
    fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Increment a counter and return the new value.
    ///
    /// When the increment creates the counter (result is 1) the key is given
    /// an expiry of `window`. Later increments leave the expiry untouched, so
    /// the window is fixed from the first hit. Implementations perform both
    /// steps atomically.
    fn incr_with_expiry(
        &self,
        key: &str,
        window: Duration,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Remove a key. No-op if the key does not exist.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Append to the list at `key`, creating it if needed. Returns the new length.
    fn list_push(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// All elements of the list at `key`, oldest first. Empty if absent.
    fn list_all(&self, key: &str) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}

/// Whole seconds for a TTL, never zero.
pub fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 || secs == 0 {
        secs + 1
    } else {
        secs
    }
}
