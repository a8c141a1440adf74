//! Whisper transcription over the OpenAI-compatible `/audio/transcriptions` endpoint.
//!
//! The upload is a multipart form (`model`, `file`) sent with reqwest; the
//! response body is `{"text": "..."}`.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use parley_core::llm::Transcriber;
use parley_types::llm::{AudioClip, LlmError};

/// Speech-to-text client.
///
/// Does not derive Debug to keep the API key out of logs.
pub struct WhisperTranscriber {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl WhisperTranscriber {
    pub fn new(api_key: SecretString, base_url: &str, model: &str, timeout: Duration) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url)
    }
}

impl Transcriber for WhisperTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, LlmError> {
        let file = Part::bytes(clip.bytes.clone())
            .file_name(clip.file_name.clone())
            .mime_str(&clip.mime_type)
            .map_err(|e| LlmError::InvalidRequest(format!("invalid mime type: {e}")))?;
        let form = Form::new().text("model", self.model.clone()).part("file", file);

        debug!(bytes = clip.bytes.len(), model = %self.model, "Uploading audio for transcription");

        let response = self
            .http
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {}", e.without_url()),
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => LlmError::AuthenticationFailed,
                429 => LlmError::RateLimited { retry_after_ms },
                400 => LlmError::InvalidRequest(error_body),
                _ => LlmError::Provider {
                    message: format!("HTTP {status}: {error_body}"),
                },
            });
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse transcription: {e}")))?;
        Ok(body.text.trim().to_string())
    }
}
