//! TelegramClient -- reqwest-based Bot API client.
//!
//! Every method is a JSON POST to `{api_base}/bot{token}/{method}`; file
//! downloads are GETs from `{api_base}/file/bot{token}/{path}`. Responses
//! are decoded from the `{ok, result, description, error_code}` envelope
//! regardless of HTTP status.
//!
//! The bot token is wrapped in [`secrecy::SecretString`] and is only
//! exposed while building a URL. reqwest errors are stripped of their URL
//! before they are turned into strings, so the token never reaches logs.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;

use parley_core::transport::ChatTransport;
use parley_types::chat::ChatId;
use parley_types::error::TransportError;
use parley_types::telegram::{ApiResult, ChatAction, ParseMode, TelegramFile, Update};

/// Default request timeout for ordinary calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra slack on top of the long-poll timeout before the HTTP call gives up.
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Telegram Bot API client.
///
/// Does not derive Debug: the token must never be printed.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    token: SecretString,
    api_base: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: ChatId,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<ParseMode>,
}

#[derive(Serialize)]
struct SendChatAction {
    chat_id: ChatId,
    action: ChatAction,
}

#[derive(Serialize)]
struct GetFile<'a> {
    file_id: &'a str,
}

#[derive(Serialize)]
struct GetUpdates<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
struct SetWebhook<'a> {
    url: &'a str,
    allowed_updates: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_token: Option<&'a str>,
}

#[derive(Serialize)]
struct NoParams {}

/// The only update type the bot consumes.
const ALLOWED_UPDATES: &[&str] = &["message"];

fn http_error(err: reqwest::Error) -> TransportError {
    TransportError::Http(err.without_url().to_string())
}

/// Unwrap a Bot API envelope into its result or an API error.
fn into_result<T>(envelope: ApiResult<T>) -> Result<T, TransportError> {
    if !envelope.ok {
        return Err(TransportError::Api {
            code: envelope.error_code,
            description: envelope
                .description
                .unwrap_or_else(|| "unknown error".to_string()),
        });
    }
    envelope
        .result
        .ok_or_else(|| TransportError::Decode("response has ok=true but no result".to_string()))
}

impl TelegramClient {
    /// Create a client for the bot identified by `token`.
    pub fn new(token: SecretString, api_base: &str) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(http_error)?;
        Ok(Self {
            http,
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.token.expose_secret())
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.api_base,
            self.token.expose_secret(),
            file_path.trim_start_matches('/')
        )
    }

    async fn call<P, R>(&self, method: &str, params: &P, timeout: Option<Duration>) -> Result<R, TransportError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.http.post(self.method_url(method)).json(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.map_err(http_error)?;
        let envelope: ApiResult<R> = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(format!("{method}: {}", e.without_url())))?;
        into_result(envelope)
    }

    /// Long-poll for updates after `offset`, waiting up to `timeout_secs` server-side.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>, TransportError> {
        let params = GetUpdates {
            offset,
            timeout: timeout_secs,
            allowed_updates: ALLOWED_UPDATES,
        };
        let wait = Duration::from_secs(timeout_secs) + POLL_GRACE;
        self.call("getUpdates", &params, Some(wait)).await
    }

    /// Point Telegram at `url` for push delivery.
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&SecretString>) -> Result<bool, TransportError> {
        let params = SetWebhook {
            url,
            allowed_updates: ALLOWED_UPDATES,
            secret_token: secret_token.map(|s| s.expose_secret()),
        };
        self.call("setWebhook", &params, None).await
    }

    pub async fn delete_webhook(&self) -> Result<bool, TransportError> {
        self.call("deleteWebhook", &NoParams {}, None).await
    }

    /// Raw `getWebhookInfo` result.
    pub async fn get_webhook_info(&self) -> Result<serde_json::Value, TransportError> {
        self.call("getWebhookInfo", &NoParams {}, None).await
    }
}

impl ChatTransport for TelegramClient {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), TransportError> {
        let params = SendMessage {
            chat_id,
            text,
            parse_mode,
        };
        let _: serde_json::Value = self.call("sendMessage", &params, None).await?;
        Ok(())
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<(), TransportError> {
        let _: bool = self
            .call("sendChatAction", &SendChatAction { chat_id, action }, None)
            .await?;
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<TelegramFile, TransportError> {
        self.call("getFile", &GetFile { file_id }, None).await
    }

    async fn download_file(&self, file_path: &str) -> Result<Vec<u8>, TransportError> {
        let response = self
            .http
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Api {
                code: Some(i64::from(status.as_u16())),
                description: format!("file download failed with HTTP {status}"),
            });
        }
        let bytes = response.bytes().await.map_err(http_error)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};

    type Calls = Arc<Mutex<Vec<(String, Value)>>>;

    /// A fake Bot API on a random local port. Records `(method, body)` pairs.
    async fn fake_bot_api() -> (String, Calls) {
        let calls: Calls = Arc::default();

        async fn method(
            State(calls): State<Calls>,
            Path((token, method)): Path<(String, String)>,
            Json(body): Json<Value>,
        ) -> Json<Value> {
            calls.lock().unwrap().push((method.clone(), body.clone()));
            if token != "bot123:abc" {
                return Json(json!({"ok": false, "error_code": 401, "description": "Unauthorized"}));
            }
            Json(match method.as_str() {
                "sendMessage" if body["text"] == "boom" => {
                    json!({"ok": false, "error_code": 400, "description": "Bad Request: can't parse entities"})
                }
                "sendMessage" => json!({"ok": true, "result": {"message_id": 1}}),
                "sendChatAction" | "setWebhook" | "deleteWebhook" => json!({"ok": true, "result": true}),
                "getFile" => json!({
                    "ok": true,
                    "result": {"file_id": body["file_id"], "file_size": 3, "file_path": "voice/file_1.oga"}
                }),
                "getUpdates" => json!({
                    "ok": true,
                    "result": [{"update_id": 9, "message": {"chat": {"id": 5}, "text": "hi"}}]
                }),
                "getWebhookInfo" => json!({"ok": true, "result": {"url": "", "pending_update_count": 0}}),
                _ => json!({"ok": false, "error_code": 404, "description": "Not Found"}),
            })
        }

        async fn file(Path((_token, path)): Path<(String, String)>) -> Vec<u8> {
            assert_eq!(path, "file_1.oga");
            vec![7, 8, 9]
        }

        let app = Router::new()
            .route("/{token}/{method}", post(method))
            .route("/file/{token}/voice/{path}", get(file))
            .with_state(calls.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), calls)
    }

    fn client(base: &str) -> TelegramClient {
        TelegramClient::new(SecretString::from("123:abc"), base).unwrap()
    }

    #[test]
    fn test_into_result_maps_api_error() {
        let envelope: ApiResult<bool> = ApiResult {
            ok: false,
            result: None,
            description: Some("Forbidden: bot was blocked by the user".to_string()),
            error_code: Some(403),
        };
        match into_result(envelope) {
            Err(TransportError::Api { code, description }) => {
                assert_eq!(code, Some(403));
                assert!(description.contains("blocked"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_into_result_requires_result_on_success() {
        let envelope: ApiResult<bool> = ApiResult {
            ok: true,
            result: None,
            description: None,
            error_code: None,
        };
        assert!(matches!(into_result(envelope), Err(TransportError::Decode(_))));
    }

    #[test]
    fn test_urls_tolerate_trailing_slash() {
        let client = TelegramClient::new(SecretString::from("t0k"), "https://api.telegram.org/").unwrap();
        assert_eq!(client.method_url("getMe"), "https://api.telegram.org/bott0k/getMe");
        assert_eq!(
            client.file_url("voice/a.oga"),
            "https://api.telegram.org/file/bott0k/voice/a.oga"
        );
    }

    #[tokio::test]
    async fn test_send_message_body() {
        let (base, calls) = fake_bot_api().await;
        let client = client(&base);

        client
            .send_message(ChatId(5), "<b>hi</b>", Some(ParseMode::Html))
            .await
            .unwrap();
        client.send_message(ChatId(5), "plain", None).await.unwrap();

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls[0].0, "sendMessage");
        assert_eq!(
            calls[0].1,
            json!({"chat_id": 5, "text": "<b>hi</b>", "parse_mode": "HTML"})
        );
        assert_eq!(calls[1].1, json!({"chat_id": 5, "text": "plain"}));
    }

    #[tokio::test]
    async fn test_send_message_api_error() {
        let (base, _) = fake_bot_api().await;
        let err = client(&base)
            .send_message(ChatId(5), "boom", Some(ParseMode::Html))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Api { code: Some(400), .. }));
    }

    #[tokio::test]
    async fn test_wrong_token_is_unauthorized() {
        let (base, _) = fake_bot_api().await;
        let client = TelegramClient::new(SecretString::from("999:zzz"), &base).unwrap();
        let err = client.delete_webhook().await.unwrap_err();
        assert!(matches!(err, TransportError::Api { code: Some(401), .. }));
    }

    #[tokio::test]
    async fn test_chat_action_and_file_download() {
        let (base, calls) = fake_bot_api().await;
        let client = client(&base);

        client.send_chat_action(ChatId(5), ChatAction::Typing).await.unwrap();
        let file = client.get_file("abc").await.unwrap();
        assert_eq!(file.file_path.as_deref(), Some("voice/file_1.oga"));
        let bytes = client.download_file("voice/file_1.oga").await.unwrap();
        assert_eq!(bytes, vec![7, 8, 9]);

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls[0].1, json!({"chat_id": 5, "action": "typing"}));
    }

    #[tokio::test]
    async fn test_get_updates_and_webhook_calls() {
        let (base, calls) = fake_bot_api().await;
        let client = client(&base);

        let updates = client.get_updates(Some(9), 0).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_id, Some(9));

        let secret = SecretString::from("s3cret");
        assert!(client.set_webhook("https://bot.example.com/api/webhook", Some(&secret)).await.unwrap());
        assert!(client.delete_webhook().await.unwrap());
        let info = client.get_webhook_info().await.unwrap();
        assert_eq!(info["pending_update_count"], 0);

        let calls = calls.lock().unwrap().clone();
        assert_eq!(
            calls[0].1,
            json!({"offset": 9, "timeout": 0, "allowed_updates": ["message"]})
        );
        assert_eq!(
            calls[1].1,
            json!({
                "url": "https://bot.example.com/api/webhook",
                "allowed_updates": ["message"],
                "secret_token": "s3cret"
            })
        );
    }
}
