//! Admin notification port.
//!
//! Notifications are best-effort: the orchestrator logs a failed delivery
//! and carries on.

use std::future::Future;

use parley_types::error::TransportError;

/// Sink for operator-facing notices (incoming message dumps, handler errors).
pub trait AdminNotifier: Send + Sync {
    fn notify(&self, text: &str) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// An unconfigured notifier drops every notice.
impl<N: AdminNotifier> AdminNotifier for Option<N> {
    async fn notify(&self, text: &str) -> Result<(), TransportError> {
        match self {
            Some(inner) => inner.notify(text).await,
            None => Ok(()),
        }
    }
}
