//! Storage abstractions for Parley.
//!
//! `KvStore` is the port every stateful component talks to. The Redis
//! implementation lives in parley-infra; `MemoryKvStore` is the
//! process-local backend used for single-instance runs and in tests.

pub mod keys;
pub mod kv_store;
pub mod memory;

pub use kv_store::KvStore;
pub use memory::MemoryKvStore;
