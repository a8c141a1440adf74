//! Shared entry point for updates from the webhook and the polling loop.

use tracing::Instrument;
use tracing::field::{Empty, debug, display};

use parley_core::orchestrator::Outcome;
use parley_observe::attrs;
use parley_types::telegram::Update;

use crate::state::Orchestrator;

/// Run one update through the orchestrator inside an `update` span.
pub async fn dispatch(orchestrator: &Orchestrator, update: &Update, source: &'static str) -> Outcome {
    let span = tracing::info_span!(
        "update",
        update.source = source,
        update.id = Empty,
        chat.id = Empty,
        parley.outcome = Empty,
    );
    if let Some(id) = update.update_id {
        span.record(attrs::UPDATE_ID, id);
    }
    if let Some(message) = &update.message {
        span.record(attrs::CHAT_ID, display(message.chat.id));
    }

    let outcome = orchestrator.handle_update(update).instrument(span.clone()).await;
    span.record(attrs::OUTCOME, debug(&outcome));
    outcome
}
