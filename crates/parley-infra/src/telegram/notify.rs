//! Admin notifications through a dedicated log bot.

use secrecy::SecretString;
use tracing::debug;

use parley_core::delivery::{TELEGRAM_MESSAGE_LIMIT, split};
use parley_core::notify::AdminNotifier;
use parley_core::transport::ChatTransport;
use parley_types::chat::ChatId;
use parley_types::config::TelegramConfig;
use parley_types::error::TransportError;

use super::client::TelegramClient;

/// Posts plain-text notices to the admin chat via the log bot.
///
/// Notices longer than one Telegram message are truncated to the first chunk.
pub struct TelegramAdminNotifier {
    client: TelegramClient,
    admin_chat: ChatId,
}

impl TelegramAdminNotifier {
    pub fn new(client: TelegramClient, admin_chat: ChatId) -> Self {
        Self { client, admin_chat }
    }

    pub fn admin_chat(&self) -> ChatId {
        self.admin_chat
    }
}

impl AdminNotifier for TelegramAdminNotifier {
    async fn notify(&self, text: &str) -> Result<(), TransportError> {
        let Some(first) = split(text, TELEGRAM_MESSAGE_LIMIT).into_iter().next() else {
            return Ok(());
        };
        if first.len() < text.len() {
            debug!(
                original_len = text.len(),
                sent_len = first.len(),
                "Truncating admin notice"
            );
        }
        self.client.send_message(self.admin_chat, first, None).await
    }
}

/// Build the notifier when both the log bot token and admin chat are configured.
///
/// Returns `Ok(None)` when either is missing; the caller treats that as
/// "notifications disabled".
pub fn build_admin_notifier(config: &TelegramConfig) -> Result<Option<TelegramAdminNotifier>, TransportError> {
    let (Some(token), Some(chat)) = (config.log_bot_token.as_ref(), config.admin_chat_id) else {
        return Ok(None);
    };
    let token: SecretString = token.clone();
    let client = TelegramClient::new(token, &config.api_base)?;
    Ok(Some(TelegramAdminNotifier::new(client, ChatId(chat))))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    async fn fake_log_bot() -> (String, Arc<Mutex<Vec<Value>>>) {
        let bodies: Arc<Mutex<Vec<Value>>> = Arc::default();

        async fn send(State(bodies): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>) -> Json<Value> {
            bodies.lock().unwrap().push(body);
            Json(json!({"ok": true, "result": {"message_id": 1}}))
        }

        let app = Router::new()
            .route("/botlog:token/sendMessage", post(send))
            .with_state(bodies.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), bodies)
    }

    fn config(base: &str, token: Option<&str>, chat: Option<i64>) -> TelegramConfig {
        TelegramConfig {
            log_bot_token: token.map(SecretString::from),
            admin_chat_id: chat,
            api_base: base.to_string(),
            ..TelegramConfig::default()
        }
    }

    #[test]
    fn test_build_requires_token_and_chat() {
        assert!(build_admin_notifier(&config("http://x", None, Some(1))).unwrap().is_none());
        assert!(build_admin_notifier(&config("http://x", Some("log:token"), None)).unwrap().is_none());
        let notifier = build_admin_notifier(&config("http://x", Some("log:token"), Some(-77)))
            .unwrap()
            .unwrap();
        assert_eq!(notifier.admin_chat(), ChatId(-77));
    }

    #[tokio::test]
    async fn test_notify_posts_plain_text_to_admin_chat() {
        let (base, bodies) = fake_log_bot().await;
        let notifier = build_admin_notifier(&config(&base, Some("log:token"), Some(99)))
            .unwrap()
            .unwrap();

        notifier.notify("[message] {\"text\":\"hi\"}").await.unwrap();

        let bodies = bodies.lock().unwrap().clone();
        assert_eq!(bodies, vec![json!({"chat_id": 99, "text": "[message] {\"text\":\"hi\"}"})]);
    }

    #[tokio::test]
    async fn test_long_notice_is_truncated() {
        let (base, bodies) = fake_log_bot().await;
        let notifier = build_admin_notifier(&config(&base, Some("log:token"), Some(99)))
            .unwrap()
            .unwrap();

        notifier.notify(&"x".repeat(5000)).await.unwrap();

        let bodies = bodies.lock().unwrap().clone();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["text"].as_str().unwrap().len(), TELEGRAM_MESSAGE_LIMIT);
    }
}
