//! OpenAI-compatible chat completion provider.
//!
//! Groq, OpenAI and most hosted open-weight endpoints speak the same chat
//! completions protocol; one provider covers them all via a configurable
//! base URL. Uses [`async_openai`] for the request/response types.

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use parley_core::llm::LlmProvider;
use parley_types::llm::{CompletionRequest, CompletionResponse, LlmError, MessageRole, Usage};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Unified provider for any OpenAI-compatible API.
///
/// Does NOT derive Debug: the `async_openai::Client` holds the API key.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
    timeout: Option<Duration>,
}

impl OpenAiCompatibleProvider {
    pub fn new(provider_name: &str, api_key: &SecretString, base_url: &str, model: &str) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key.expose_secret())
            .with_api_base(base_url.trim_end_matches('/'));

        Self {
            client: Client::with_config(openai_config),
            provider_name: provider_name.to_string(),
            model: model.to_string(),
            timeout: None,
        }
    }

    /// Create a Groq provider.
    ///
    /// Uses `https://api.groq.com/openai/v1` as the base URL.
    pub fn groq(api_key: &SecretString, model: &str) -> Self {
        Self::new("groq", api_key, GROQ_BASE_URL, model)
    }

    /// Give up on a completion after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic [`CompletionRequest`].
    fn build_request(&self, request: &CompletionRequest) -> CreateChatCompletionRequest {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(request.messages.len() + 1);

        if let Some(ref system) = request.system {
            messages.push(system_message(system));
        }

        for turn in &request.messages {
            let message = match turn.role {
                MessageRole::User => {
                    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(turn.content.clone()),
                        name: None,
                    })
                }
                MessageRole::Assistant => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                            turn.content.clone(),
                        )),
                        refusal: None,
                        name: None,
                        audio: None,
                        tool_calls: None,
                        function_call: None,
                    })
                }
            };
            messages.push(message);
        }

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        CreateChatCompletionRequest {
            model,
            messages,
            ..Default::default()
        }
    }
}

fn system_message(text: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(text.to_string()),
        name: None,
    })
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = self.build_request(request);
        debug!(
            model = %oai_request.model,
            messages = oai_request.messages.len(),
            "Sending chat completion"
        );

        let chat = self.client.chat();
        let call = chat.create(oai_request);
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| LlmError::Provider {
                    message: format!("completion timed out after {}s", limit.as_secs()),
                })?,
            None => call.await,
        }
        .map_err(map_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: response.id,
            content,
            model: response.model,
            usage,
        })
    }
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "invalid_api_key"
                || error_type == "authentication_error"
                || api_err.message.contains("Invalid API Key")
                || api_err.message.contains("Incorrect API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                LlmError::RateLimited {
                    retry_after_ms: None,
                }
            } else if error_type == "invalid_request_error" {
                LlmError::InvalidRequest(api_err.message.clone())
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status().map(|s| s.as_u16()) {
            Some(401) => LlmError::AuthenticationFailed,
            Some(429) => LlmError::RateLimited {
                retry_after_ms: None,
            },
            _ => LlmError::Provider {
                message: err.to_string(),
            },
        },
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::error::{ApiError, OpenAIError};
    use parley_types::chat::Turn;

    fn provider() -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::groq(&SecretString::from("gsk_test"), "llama-3.3-70b-versatile")
    }

    fn api_error(message: &str, r#type: Option<&str>, code: Option<&str>) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: r#type.map(str::to_string),
            param: None,
            code: code.map(str::to_string),
        })
    }

    #[test]
    fn test_groq_factory() {
        let provider = provider();
        assert_eq!(provider.name(), "groq");
        assert_eq!(provider.model(), "llama-3.3-70b-versatile");
        assert!(provider.timeout.is_none());
    }

    #[test]
    fn test_build_request_puts_system_prompt_first() {
        let request = CompletionRequest::new(vec![Turn::user("Hello"), Turn::assistant("Hi there!")])
            .with_system(Some("Be helpful".to_string()));

        let oai_req = provider().build_request(&request);
        assert_eq!(oai_req.model, "llama-3.3-70b-versatile");
        assert_eq!(oai_req.messages.len(), 3);
        assert!(matches!(oai_req.messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(oai_req.messages[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(oai_req.messages[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(oai_req.max_completion_tokens.is_none());
    }

    #[test]
    fn test_build_request_without_system_prompt() {
        let request = CompletionRequest::new(vec![Turn::user("Hello")]);
        let oai_req = provider().build_request(&request);
        assert_eq!(oai_req.messages.len(), 1);
    }

    #[test]
    fn test_build_request_model_override() {
        let mut request = CompletionRequest::new(vec![]);
        request.model = "llama-3.1-8b-instant".to_string();

        let oai_req = provider().build_request(&request);
        assert_eq!(oai_req.model, "llama-3.1-8b-instant");
    }

    async fn fake_completions(delay: Duration) -> String {
        use axum::Json;
        use axum::routing::post;
        use serde_json::{Value, json};

        let app = axum::Router::new().route(
            "/v1/chat/completions",
            post(move |Json(body): Json<Value>| async move {
                tokio::time::sleep(delay).await;
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["messages"][1]["content"], "Hello");
                Json(json!({
                    "id": "chatcmpl-1",
                    "object": "chat.completion",
                    "created": 1700000000,
                    "model": body["model"],
                    "choices": [{
                        "index": 0,
                        "message": {"role": "assistant", "content": "Hi from the model"},
                        "finish_reason": "stop",
                        "logprobs": null
                    }],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn hello_request() -> CompletionRequest {
        CompletionRequest::new(vec![Turn::user("Hello")]).with_system(Some("Be brief".to_string()))
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice_and_usage() {
        let base = fake_completions(Duration::ZERO).await;
        let provider = OpenAiCompatibleProvider::new(
            "groq",
            &SecretString::from("gsk_test"),
            &base,
            "llama-3.3-70b-versatile",
        )
        .with_timeout(Duration::from_secs(5));

        let response = provider.complete(&hello_request()).await.unwrap();
        assert_eq!(response.content, "Hi from the model");
        assert_eq!(response.model, "llama-3.3-70b-versatile");
        assert_eq!(response.usage.input_tokens, 12);
        assert_eq!(response.usage.output_tokens, 4);
    }

    #[tokio::test]
    async fn test_complete_times_out() {
        let base = fake_completions(Duration::from_secs(5)).await;
        let provider = OpenAiCompatibleProvider::new(
            "groq",
            &SecretString::from("gsk_test"),
            &base,
            "llama-3.3-70b-versatile",
        )
        .with_timeout(Duration::from_millis(100));

        let err = provider.complete(&hello_request()).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
    }

    #[test]
    fn test_map_openai_error_auth() {
        let err = map_openai_error(api_error("Invalid API Key", Some("invalid_request_error"), Some("invalid_api_key")));
        assert!(matches!(err, LlmError::AuthenticationFailed));
    }

    #[test]
    fn test_map_openai_error_rate_limit() {
        let err = map_openai_error(api_error("Rate limit reached", Some("tokens"), Some("rate_limit_exceeded")));
        assert!(matches!(err, LlmError::RateLimited { .. }));
    }

    #[test]
    fn test_map_openai_error_invalid_request() {
        let err = map_openai_error(api_error("model not found", Some("invalid_request_error"), None));
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }

    #[test]
    fn test_map_openai_error_invalid_argument() {
        let err = map_openai_error(OpenAIError::InvalidArgument("bad arg".to_string()));
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }
}
