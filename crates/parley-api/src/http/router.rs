//! Axum router configuration.
//!
//! Telegram posts updates to `/api/webhook` (the path `parley webhook set`
//! registers); `/webhook` is kept as an alias. Other methods on those paths
//! get 405 from the method router.

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

pub const WEBHOOK_PATH: &str = "/api/webhook";

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(handlers::webhook::receive_update))
        .route("/webhook", post(handlers::webhook::receive_update))
        .route("/health", get(handlers::health::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
