//! LLM request/response types for Parley.
//!
//! These model the data shapes exchanged with the completion provider and
//! the transcription provider. Both are consumed as opaque request/response
//! calls; nothing here knows about HTTP.

use serde::{Deserialize, Serialize};

/// Author of a stored turn. The system prompt travels separately in
/// [`CompletionRequest::system`] and is never part of history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Request to an LLM provider for a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Empty means "use the provider's configured model".
    pub model: String,
    pub messages: Vec<crate::chat::Turn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl CompletionRequest {
    /// Build a request for the provider's default model.
    pub fn new(messages: Vec<crate::chat::Turn>) -> Self {
        Self {
            model: String::new(),
            messages,
            system: None,
        }
    }

    pub fn with_system(mut self, system: Option<String>) -> Self {
        self.system = system;
        self
    }
}

/// Response from an LLM provider for a non-streaming completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    /// Text of the first choice; empty when the provider returned none.
    pub content: String,
    pub model: String,
    pub usage: Usage,
}

/// Token usage for a completion request/response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// An audio payload handed to the transcription provider.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime_type: String,
}

impl AudioClip {
    /// Telegram voice notes are always OGG/Opus.
    pub fn voice_note(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: "voice.ogg".to_string(),
            mime_type: "audio/ogg".to_string(),
        }
    }
}

/// Errors from LLM provider operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_role_serializes_lowercase() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn test_system_role_is_not_a_turn_role() {
        assert!(serde_json::from_str::<MessageRole>("\"system\"").is_err());
        assert!(serde_json::from_str::<MessageRole>("\"narrator\"").is_err());
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::Provider {
            message: "HTTP 500".to_string(),
        };
        assert_eq!(err.to_string(), "provider error: HTTP 500");
    }
}
