//! Span field names shared by the HTTP and polling entry points.
//!
//! Fields declared as `tracing::field::Empty` in a span can be filled in
//! later with `span.record(attrs::CHAT_ID, ...)`. The `gen_ai.*` names follow
//! the OpenTelemetry GenAI semantic conventions.

/// Telegram chat the update belongs to.
pub const CHAT_ID: &str = "chat.id";

/// `update_id` of the inbound Telegram update.
pub const UPDATE_ID: &str = "update.id";

/// How the update arrived (`webhook` or `poll`).
pub const UPDATE_SOURCE: &str = "update.source";

/// Terminal state of the message handler.
pub const OUTCOME: &str = "parley.outcome";

/// The name of the GenAI provider (e.g., "groq").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

/// The model ID requested.
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

// --- Source values ---

pub const SOURCE_WEBHOOK: &str = "webhook";

pub const SOURCE_POLL: &str = "poll";
