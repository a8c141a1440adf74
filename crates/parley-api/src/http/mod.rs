//! HTTP layer: the Telegram webhook receiver and a health probe.

pub mod error;
pub mod handlers;
pub mod router;
