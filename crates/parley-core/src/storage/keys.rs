//! Key layout in the shared store.
//!
//! All per-chat state is namespaced by the decimal chat id, so chats never
//! observe each other's keys.

use parley_types::chat::ChatId;

pub fn conversation_key(chat_id: ChatId) -> String {
    format!("conversation:{chat_id}")
}

pub fn rate_limit_key(chat_id: ChatId) -> String {
    format!("rate_limit:{chat_id}")
}

pub fn tasks_key(chat_id: ChatId) -> String {
    format!("tasks:{chat_id}")
}
