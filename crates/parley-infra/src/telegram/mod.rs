//! Telegram Bot API adapters.
//!
//! - [`client::TelegramClient`]: the bot's own transport (implements `ChatTransport`)
//!   plus the update-polling and webhook-management calls the CLI uses
//! - [`notify::TelegramAdminNotifier`]: posts operator notices through a separate log bot

pub mod client;
pub mod notify;

pub use client::TelegramClient;
pub use notify::TelegramAdminNotifier;
