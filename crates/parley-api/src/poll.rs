//! Long-polling loop (`parley poll`).
//!
//! Fetches updates with `getUpdates`, advancing the offset past every
//! update it has seen, and handles each one in its own task. On shutdown
//! the loop stops fetching and waits for in-flight updates to finish.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use parley_observe::attrs;
use parley_types::error::TransportError;

use crate::dispatch::dispatch;
use crate::state::AppState;

/// Server-side wait for `getUpdates`.
pub const POLL_TIMEOUT_SECS: u64 = 30;

/// Pause after a failed `getUpdates` before trying again.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Poll until `shutdown` resolves.
///
/// Fails only when Telegram refuses polling because a webhook is set.
pub async fn run_polling<F>(state: AppState, timeout_secs: u64, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut offset: Option<i64> = None;
    let mut in_flight = JoinSet::new();

    info!(timeout_secs, "long polling started");
    loop {
        while in_flight.try_join_next().is_some() {}

        let fetched = tokio::select! {
            _ = &mut shutdown => break,
            fetched = state.orchestrator.transport().get_updates(offset, timeout_secs) => fetched,
        };

        match fetched {
            Ok(updates) => {
                if !updates.is_empty() {
                    debug!(count = updates.len(), "received updates");
                }
                for update in updates {
                    if let Some(id) = update.update_id {
                        offset = offset.max(Some(id + 1));
                    }
                    let orchestrator = state.orchestrator.clone();
                    in_flight.spawn(async move {
                        dispatch(&orchestrator, &update, attrs::SOURCE_POLL).await;
                    });
                }
            }
            Err(TransportError::Api { code: Some(409), description }) => {
                anyhow::bail!(
                    "Telegram refused getUpdates ({description}); run `parley webhook delete` first"
                );
            }
            Err(e) => {
                warn!(error = %e, "getUpdates failed, retrying in {}s", RETRY_DELAY.as_secs());
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => {}
                }
            }
        }
    }

    info!(pending = in_flight.len(), "long polling stopped, draining in-flight updates");
    while in_flight.join_next().await.is_some() {}
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use tokio::sync::Notify;

    use crate::state::test_support::app_state;

    #[derive(Clone, Default)]
    struct FakeApi {
        offsets: Arc<Mutex<Vec<Value>>>,
        sent: Arc<Mutex<Vec<Value>>>,
        delivered: Arc<Notify>,
    }

    async fn fake_bot_api(webhook_active: bool) -> (String, FakeApi) {
        let api = FakeApi::default();

        async fn method(
            State((api, webhook_active)): State<(FakeApi, bool)>,
            Path((_token, method)): Path<(String, String)>,
            Json(body): Json<Value>,
        ) -> Json<Value> {
            match method.as_str() {
                "getUpdates" if webhook_active => Json(json!({
                    "ok": false,
                    "error_code": 409,
                    "description": "Conflict: can't use getUpdates method while webhook is active"
                })),
                "getUpdates" => {
                    api.offsets.lock().unwrap().push(body["offset"].clone());
                    if body["offset"].is_null() {
                        Json(json!({"ok": true, "result": [
                            {"update_id": 41, "message": {"chat": {"id": 5}, "text": "/clear"}},
                            {"update_id": 40}
                        ]}))
                    } else {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Json(json!({"ok": true, "result": []}))
                    }
                }
                "sendMessage" => {
                    api.sent.lock().unwrap().push(body);
                    api.delivered.notify_one();
                    Json(json!({"ok": true, "result": {"message_id": 1}}))
                }
                _ => Json(json!({"ok": true, "result": true})),
            }
        }

        let app = Router::new()
            .route("/{token}/{method}", post(method))
            .with_state((api.clone(), webhook_active));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), api)
    }

    #[tokio::test]
    async fn test_polling_advances_offset_and_handles_updates() {
        let (base, api) = fake_bot_api(false).await;
        let state = app_state(&base, None);

        let delivered = api.delivered.clone();
        run_polling(state, 0, async move { delivered.notified().await })
            .await
            .unwrap();

        let sent = api.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["chat_id"], 5);
        assert_eq!(sent[0]["text"], "Conversation history cleared.");

        let offsets = api.offsets.lock().unwrap().clone();
        assert!(offsets[0].is_null());
        assert!(offsets[1..].iter().all(|o| *o == json!(42)));
    }

    #[tokio::test]
    async fn test_polling_refuses_while_webhook_is_set() {
        let (base, _api) = fake_bot_api(true).await;
        let err = run_polling(app_state(&base, None), 0, std::future::pending())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("webhook delete"));
    }
}
