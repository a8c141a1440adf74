//! Per-chat task list entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A to-do entry stored under `tasks:<chat_id>`.
///
/// `time` is the free-form `HH:MM` string the user typed; it is not parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub description: String,
    pub time: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(description: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            time: time.into(),
            created_at: Utc::now(),
        }
    }
}
