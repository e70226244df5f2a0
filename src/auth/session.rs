//! In-memory session cache synchronized with the secure token store
//!
//! [`SessionCache`] owns the single process-wide session: the two tokens
//! plus whether they have been hydrated from storage yet.
//!
//! - Reads (`access_token`, `refresh_token`) are synchronous and never touch
//!   storage.
//! - Hydration is a one-shot gate. Concurrent first callers queue on the
//!   gate and the first one performs the only storage read.
//! - Every mutation runs under the same gate, so a hydration can never
//!   interleave with a concurrent write and resurrect a stale token.
//! - Clearing resets the gate, forcing one re-hydration on next use. A
//!   failed delete leaves the gate closed instead.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{Mutex, MutexGuard, broadcast};

use super::store::{SharedTokenStore, StorageError};
use crate::events::{ClearReason, EventBus, SessionEvent};
use crate::types::{StorageKeys, TokenKind, TokenPair};
use crate::utils::redact_optional;

/// Snapshot of the session state
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Bearer credential for authenticated requests
    pub access_token: Option<String>,
    /// Credential used solely to mint a new access token
    pub refresh_token: Option<String>,
    /// Whether the cache has been hydrated from storage
    pub initialized: bool,
}

impl SessionState {
    /// Access token, if present and non-empty
    #[must_use]
    pub fn usable_access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Refresh token, if present and non-empty
    #[must_use]
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("access_token", &redact_optional(self.access_token.as_deref()))
            .field("refresh_token", &redact_optional(self.refresh_token.as_deref()))
            .field("initialized", &self.initialized)
            .finish()
    }
}

/// Process-wide token cache
pub struct SessionCache {
    store: SharedTokenStore,
    keys: StorageKeys,
    state: RwLock<SessionState>,
    /// Serializes hydration and every mutation
    gate: Mutex<()>,
    hydrations: AtomicUsize,
    events: EventBus,
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("keys", &self.keys)
            .field("state", &*self.read_state())
            .finish_non_exhaustive()
    }
}

impl SessionCache {
    /// Create an empty, uninitialized session over `store`
    pub fn new(store: SharedTokenStore, keys: StorageKeys) -> Self {
        Self {
            store,
            keys,
            state: RwLock::new(SessionState::default()),
            gate: Mutex::new(()),
            hydrations: AtomicUsize::new(0),
            events: EventBus::new(),
        }
    }

    /// Storage keys in use
    #[must_use]
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    // ========================================================================
    // Accessors (no I/O)
    // ========================================================================

    /// Cached access token
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.read_state().access_token.clone()
    }

    /// Cached refresh token
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.read_state().refresh_token.clone()
    }

    /// Whether hydration has happened since construction or the last clear
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.read_state().initialized
    }

    /// Copy of the whole state
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.read_state().clone()
    }

    /// Number of storage hydrations performed so far
    #[must_use]
    pub fn hydration_count(&self) -> usize {
        self.hydrations.load(Ordering::SeqCst)
    }

    /// Subscribe to session lifecycle events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Hydration
    // ========================================================================

    /// Load both tokens from storage unless that already happened.
    ///
    /// Safe under concurrent first calls: late arrivals wait on the gate and
    /// then observe the completed hydration.
    pub async fn ensure_hydrated(&self) {
        if self.is_initialized() {
            return;
        }
        let guard = self.gate.lock().await;
        self.hydrate_locked(&guard).await;
    }

    /// Hydrate while already holding the gate
    async fn hydrate_locked(&self, _gate: &MutexGuard<'_, ()>) {
        if self.is_initialized() {
            return;
        }

        let access_token = self.read_stored(TokenKind::Access).await;
        let refresh_token = self.read_stored(TokenKind::Refresh).await;
        self.hydrations.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            has_access_token = access_token.is_some(),
            has_refresh_token = refresh_token.is_some(),
            "Hydrated session from secure storage"
        );

        *self.write_state() = SessionState {
            access_token,
            refresh_token,
            initialized: true,
        };
    }

    /// Storage read failures degrade to "no token"
    async fn read_stored(&self, kind: TokenKind) -> Option<String> {
        match self.store.read(self.keys.key(kind)).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, token = %kind, "Failed to read token from secure storage");
                None
            }
        }
    }

    // ========================================================================
    // Mutators
    // ========================================================================

    /// Replace both tokens: memory first, then storage.
    ///
    /// # Errors
    /// Returns `StorageError` if either token cannot be persisted.
    pub async fn set_tokens(&self, pair: TokenPair) -> Result<(), StorageError> {
        self.replace_pair(pair, SessionEvent::TokensUpdated).await
    }

    /// Replace both tokens after a successful refresh
    pub(crate) async fn apply_refresh(&self, pair: TokenPair) -> Result<(), StorageError> {
        self.replace_pair(pair, SessionEvent::Refreshed).await
    }

    async fn replace_pair(&self, pair: TokenPair, event: SessionEvent) -> Result<(), StorageError> {
        let _gate = self.gate.lock().await;

        let previous = std::mem::replace(
            &mut *self.write_state(),
            SessionState {
                access_token: Some(pair.access_token.clone()),
                refresh_token: Some(pair.refresh_token.clone()),
                initialized: true,
            },
        );

        if let Err(e) = self
            .store
            .write(self.keys.key(TokenKind::Access), &pair.access_token)
            .await
        {
            *self.write_state() = previous;
            return Err(e);
        }
        if let Err(e) = self
            .store
            .write(self.keys.key(TokenKind::Refresh), &pair.refresh_token)
            .await
        {
            self.restore_stored(TokenKind::Access, &previous).await;
            *self.write_state() = previous;
            return Err(e);
        }

        self.events.emit(event);
        Ok(())
    }

    /// Put back the stored value of `kind` after a partially failed write.
    ///
    /// Only possible when `previous` was hydrated; otherwise the prior stored
    /// value is unknown and the next hydration reads whatever is there.
    async fn restore_stored(&self, kind: TokenKind, previous: &SessionState) {
        if !previous.initialized {
            tracing::warn!(token = %kind, "Stored tokens may be inconsistent after a failed write");
            return;
        }
        let key = self.keys.key(kind);
        let value = match kind {
            TokenKind::Access => previous.access_token.as_deref(),
            TokenKind::Refresh => previous.refresh_token.as_deref(),
        };
        let restored = match value {
            Some(value) => self.store.write(key, value).await,
            None => self.store.delete(key).await,
        };
        if let Err(e) = restored {
            tracing::warn!(error = %e, token = %kind, "Failed to restore stored token");
        }
    }

    /// Replace the access token only
    ///
    /// # Errors
    /// Returns `StorageError` if the token cannot be persisted.
    pub async fn set_access_token(&self, token: impl Into<String>) -> Result<(), StorageError> {
        self.replace_one(TokenKind::Access, token.into()).await
    }

    /// Replace the refresh token only
    ///
    /// # Errors
    /// Returns `StorageError` if the token cannot be persisted.
    pub async fn set_refresh_token(&self, token: impl Into<String>) -> Result<(), StorageError> {
        self.replace_one(TokenKind::Refresh, token.into()).await
    }

    async fn replace_one(&self, kind: TokenKind, token: String) -> Result<(), StorageError> {
        let gate = self.gate.lock().await;
        // Hydrate first so the other field is not later overwritten from storage
        self.hydrate_locked(&gate).await;

        let previous = {
            let mut state = self.write_state();
            let previous = state.clone();
            match kind {
                TokenKind::Access => state.access_token = Some(token.clone()),
                TokenKind::Refresh => state.refresh_token = Some(token.clone()),
            }
            previous
        };

        if let Err(e) = self.store.write(self.keys.key(kind), &token).await {
            *self.write_state() = previous;
            return Err(e);
        }
        self.events.emit(SessionEvent::TokensUpdated);
        Ok(())
    }

    /// Drop both tokens from memory and storage and reset the hydration gate.
    ///
    /// Idempotent. Both deletes are attempted even if the first fails. If a
    /// delete fails the gate stays closed, so the stored token is not
    /// hydrated back into memory.
    ///
    /// # Errors
    /// Returns the first `StorageError` encountered. Memory is cleared either way.
    pub async fn clear(&self, reason: ClearReason) -> Result<(), StorageError> {
        let _gate = self.gate.lock().await;

        *self.write_state() = SessionState {
            initialized: true,
            ..SessionState::default()
        };

        let access = self.store.delete(self.keys.key(TokenKind::Access)).await;
        let refresh = self.store.delete(self.keys.key(TokenKind::Refresh)).await;
        let deleted = access.and(refresh);

        match &deleted {
            Ok(()) => {
                self.write_state().initialized = false;
                tracing::debug!(reason = ?reason, "Session cleared");
            }
            Err(e) => tracing::warn!(
                reason = ?reason,
                error = %e,
                "Session cleared in memory but stored tokens remain"
            ),
        }

        self.events.emit(SessionEvent::Cleared { reason });
        deleted
    }

    // ========================================================================
    // Queries that may touch storage
    // ========================================================================

    /// Cache-first authentication check.
    ///
    /// Falls back to reading the stored access token when the cache holds
    /// none, without altering the cache.
    pub async fn is_authenticated(&self) -> bool {
        if self.read_state().usable_access_token().is_some() {
            return true;
        }
        self.read_stored(TokenKind::Access)
            .await
            .is_some_and(|token| !token.is_empty())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
