//! Provider trait definitions.
//!
//! Both traits use RPITIT so the orchestrator can stay generic over
//! concrete providers without boxing. Implementations live in parley-infra
//! (the OpenAI-compatible Groq client and the Whisper transcriber).

use std::future::Future;

use parley_types::llm::{AudioClip, CompletionRequest, CompletionResponse, LlmError};

/// Trait for chat completion backends.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "groq").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, LlmError>> + Send;
}

/// Trait for speech-to-text backends.
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio clip. An empty string means nothing was recognised.
    fn transcribe(&self, clip: &AudioClip) -> impl Future<Output = Result<String, LlmError>> + Send;
}
