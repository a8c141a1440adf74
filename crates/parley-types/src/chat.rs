//! Conversation types for Parley.
//!
//! A chat's history is an ordered list of [`Turn`]s, oldest first. The list
//! is what gets serialized into the key-value store under
//! `conversation:<chat_id>`.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::llm::MessageRole;

/// Telegram chat identifier.
///
/// Telegram uses signed 64-bit ids (group chats are negative). Keys in the
/// store use the decimal rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId(id)
    }
}

/// One dialogue entry.
///
/// Serialized as `{"role": "user", "content": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: MessageRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_wire_format() {
        let turn = Turn::user("hello");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn test_history_deserializes_in_order() {
        let raw = r#"[{"role":"user","content":"a"},{"role":"assistant","content":"b"}]"#;
        let turns: Vec<Turn> = serde_json::from_str(raw).unwrap();
        assert_eq!(turns, vec![Turn::user("a"), Turn::assistant("b")]);
    }

    #[test]
    fn test_history_with_system_turn_is_rejected() {
        let raw = r#"[{"role":"system","content":"obey"},{"role":"user","content":"a"}]"#;
        assert!(serde_json::from_str::<Vec<Turn>>(raw).is_err());
    }

    #[test]
    fn test_chat_id_display_and_serde() {
        let id = ChatId(-100123);
        assert_eq!(id.to_string(), "-100123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "-100123");
    }
}
