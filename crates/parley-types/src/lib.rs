//! Shared domain types for Parley.
//!
//! Conversation turns, Telegram wire shapes, task entries, configuration,
//! and the error enums shared across crates.
//!
//! Zero infrastructure dependencies -- only serde, chrono, secrecy and thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod task;
pub mod telegram;
