//! Session lifecycle events
//!
//! Subscribe with [`AuthClient::subscribe`](crate::AuthClient::subscribe) to
//! learn when the session is replaced, refreshed, or cleared. A
//! `Cleared { reason: RefreshFailed }` event is the signal to route the user
//! back to login.

use tokio::sync::broadcast;

/// Capacity of the session event channel
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Why a session was cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    /// The application asked for it (logout)
    Logout,
    /// A 401 could not be recovered from
    RefreshFailed,
}

/// Emitted after the corresponding store write completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Tokens were set by the application (e.g. after login)
    TokensUpdated,
    /// Tokens were replaced by a successful refresh
    Refreshed,
    /// Both tokens were removed from memory and storage
    Cleared {
        /// What triggered the clear
        reason: ClearReason,
    },
}

/// Sender half kept by the session cache
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; having no subscribers is fine
    pub(crate) fn emit(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!(event = ?event, "No session event subscribers");
        }
    }
}
