//! Telegram webhook receiver.
//!
//! The update is processed before responding, so graceful shutdown lets
//! in-flight messages finish. The response is 200 whatever the outcome:
//! a non-2xx answer makes Telegram redeliver the update and repeat its side
//! effects.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use parley_observe::attrs;
use parley_types::telegram::Update;

use crate::dispatch::dispatch;
use crate::http::error::AppError;
use crate::state::AppState;

/// Header Telegram sets when a secret token was registered with `setWebhook`.
pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

/// POST /api/webhook - receive one update.
pub async fn receive_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    if let Some(expected) = &state.webhook_secret {
        let provided = headers
            .get(SECRET_HEADER)
            .map(|v| v.as_bytes())
            .unwrap_or_default();
        if !constant_time_eq(provided, expected.expose_secret().as_bytes()) {
            tracing::warn!("rejected webhook call with a missing or wrong secret token");
            return Err(AppError::Unauthorized("invalid secret token".to_string()));
        }
    }

    if body.is_empty() {
        return Err(AppError::BadRequest("missing request body".to_string()));
    }
    let update: Update = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("invalid update: {e}")))?;

    dispatch(&state.orchestrator, &update, attrs::SOURCE_WEBHOOK).await;
    Ok(Json(json!({"ok": true})))
}

/// Constant-time byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
