//! Chat transport port.
//!
//! The Telegram Bot API client in parley-infra implements this. Every call
//! is a single HTTP round trip; none of them retry.

use std::future::Future;

use parley_types::chat::ChatId;
use parley_types::error::TransportError;
use parley_types::telegram::{ChatAction, ParseMode, TelegramFile};

/// Outbound side of the chat platform.
pub trait ChatTransport: Send + Sync {
    /// Send one message. `parse_mode` selects how the platform interprets markup.
    fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Show a transient status such as "typing..." in the chat.
    fn send_chat_action(
        &self,
        chat_id: ChatId,
        action: ChatAction,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Resolve a file id to its metadata and download path.
    fn get_file(&self, file_id: &str) -> impl Future<Output = Result<TelegramFile, TransportError>> + Send;

    /// Download the bytes at a path returned by [`ChatTransport::get_file`].
    fn download_file(&self, file_path: &str) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}
