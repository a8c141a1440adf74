//! Model provider abstractions for Parley.
//!
//! - `LlmProvider`: chat completion over the conversation history
//! - `Transcriber`: speech-to-text for voice notes

pub mod provider;

pub use provider::{LlmProvider, Transcriber};
