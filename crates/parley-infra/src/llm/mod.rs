//! Model provider implementations.
//!
//! - [`openai_compat::OpenAiCompatibleProvider`]: chat completions over the
//!   OpenAI protocol (Groq by default)
//! - [`whisper::WhisperTranscriber`]: speech-to-text via the
//!   `/audio/transcriptions` endpoint of the same API

pub mod openai_compat;
pub mod whisper;

pub use openai_compat::OpenAiCompatibleProvider;
pub use whisper::WhisperTranscriber;

use parley_types::config::LlmConfig;
use parley_types::llm::LlmError;
use secrecy::SecretString;

fn require_key(config: &LlmConfig) -> Result<&SecretString, LlmError> {
    config.api_key.as_ref().ok_or(LlmError::AuthenticationFailed)
}

/// Build the completion provider described by `config`.
pub fn create_provider(config: &LlmConfig) -> Result<OpenAiCompatibleProvider, LlmError> {
    let key = require_key(config)?;
    Ok(OpenAiCompatibleProvider::new(
        "groq",
        key,
        &config.base_url,
        &config.text_model,
    )
    .with_timeout(std::time::Duration::from_secs(config.timeout_secs)))
}

/// Build the transcriber described by `config`.
pub fn create_transcriber(config: &LlmConfig) -> Result<WhisperTranscriber, LlmError> {
    let key = require_key(config)?;
    WhisperTranscriber::new(
        key.clone(),
        &config.base_url,
        &config.audio_model,
        std::time::Duration::from_secs(config.timeout_secs),
    )
}
