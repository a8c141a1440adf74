//! Business logic and port traits for Parley.
//!
//! This crate defines the "ports" (store, transport, provider and notifier
//! traits) that the infrastructure layer implements, plus everything that
//! runs on the message path: rate limiting, history, markup rendering,
//! chunked delivery and the session orchestrator. It depends only on
//! `parley-types` -- never on `parley-infra` or any network/IO crate.

pub mod conversation;
pub mod delivery;
pub mod limiter;
pub mod llm;
pub mod notify;
pub mod orchestrator;
pub mod render;
pub mod storage;
pub mod tasks;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;
