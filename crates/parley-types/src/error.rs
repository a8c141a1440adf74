use thiserror::Error;

use crate::llm::LlmError;

/// Errors from key-value store operations (used by trait definitions in parley-core).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection error: {0}")]
    Connection(String),

    #[error("store command error: {0}")]
    Command(String),

    #[error("value at '{0}' has the wrong type")]
    WrongType(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors from the chat transport (Telegram Bot API).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Telegram API error{}: {description}", .code.map(|c| format!(" {c}")).unwrap_or_default())]
    Api {
        code: Option<i64>,
        description: String,
    },

    #[error("failed to decode Telegram response: {0}")]
    Decode(String),

    #[error("file '{0}' is not available for download")]
    FileUnavailable(String),
}

/// Errors while turning a voice note into text.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("voice file is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("voice download failed: {0}")]
    Transport(#[from] TransportError),

    #[error("transcription failed: {0}")]
    Transcription(#[from] LlmError),
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    #[error("failed to read config file: {0}")]
    Read(String),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Any failure on the message path. The orchestrator's error boundary turns
/// these into a user notice and a log entry.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Voice(#[from] VoiceError),
}
