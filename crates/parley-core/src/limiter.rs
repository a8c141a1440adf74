//! Fixed-window per-chat rate limiter.
//!
//! Each chat has a counter in the shared store that is created with a
//! window-long expiry on its first hit. Messages past the threshold are
//! rejected until the counter expires. The user is told to slow down once
//! per window, on the first rejected message only.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use parley_types::chat::ChatId;

use crate::storage::KvStore;
use crate::storage::keys::rate_limit_key;

/// Notice sent on the first rejected message of a window.
pub const SLOW_DOWN_NOTICE: &str = "You are sending messages too fast. Please wait a minute.";

/// Admission decision for one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// The store was unreachable; the message is admitted anyway.
    FailedOpen,
    /// Over the threshold. `notify` is set exactly once per window.
    Blocked { notify: bool },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, RateDecision::Blocked { .. })
    }

    /// Classify the counter value returned by the store.
    pub fn from_count(count: u64, max_per_window: u64) -> Self {
        if count <= max_per_window {
            RateDecision::Allowed
        } else {
            RateDecision::Blocked {
                notify: count == max_per_window + 1,
            }
        }
    }
}

pub struct RateLimiter<S> {
    store: Arc<S>,
    max_per_window: u64,
    window: Duration,
}

impl<S: KvStore> RateLimiter<S> {
    pub fn new(store: Arc<S>, max_per_window: u64, window: Duration) -> Self {
        Self {
            store,
            max_per_window,
            window,
        }
    }

    /// Count this message against the chat's window and decide whether to admit it.
    ///
    /// Never fails: a store error admits the message and logs a warning.
    pub async fn check(&self, chat_id: ChatId) -> RateDecision {
        let key = rate_limit_key(chat_id);
        match self.store.incr_with_expiry(&key, self.window).await {
            Ok(count) => {
                let decision = RateDecision::from_count(count, self.max_per_window);
                debug!(chat_id = %chat_id, count, ?decision, "rate limit checked");
                decision
            }
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "rate limit store unavailable, admitting message");
                RateDecision::FailedOpen
            }
        }
    }
}
