//! Infrastructure implementations for Parley.
//!
//! This crate implements the port traits defined in `parley-core` against
//! real services: Redis for shared state, the Telegram Bot API for
//! transport and admin notices, and Groq's OpenAI-compatible endpoints for
//! completion and transcription. Configuration loading lives here too.

pub mod config;
pub mod llm;
pub mod store;
pub mod telegram;
