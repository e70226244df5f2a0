//! `AuthClient`, the authenticated HTTP client
//!
//! Every request goes through the [`AuthInterceptor`]:
//! - The session is hydrated from secure storage on first use
//! - The cached access token is attached as `Authorization: Bearer ...`
//! - A 401 triggers one refresh and one retry
//! - An unrecoverable 401 clears the session and is returned as-is
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                      AuthClient                        │
//! │                                                        │
//! │  ┌──────────────────┐        ┌──────────────────┐     │
//! │  │  AuthInterceptor │───────→│   SessionCache   │     │
//! │  │                  │        │  (memory + gate) │     │
//! │  └───┬─────────┬────┘        └────────┬─────────┘     │
//! │      │         │                      │               │
//! │      ▼         ▼                      ▼               │
//! │  ┌─────────┐ ┌──────────────┐ ┌──────────────────┐    │
//! │  │Transport│ │Refresh       │ │SecureTokenStore  │    │
//! │  │(primary)│ │Transport     │ │                  │    │
//! │  └─────────┘ └──────────────┘ └──────────────────┘    │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! # Example: Basic Usage
//!
//! ```no_run
//! use bearer_guard::{AuthClient, AuthClientOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = AuthClientOptions::builder()
//!     .base_url("https://api.example.com")
//!     .refresh_path("/auth/refresh")
//!     .build();
//! let client = AuthClient::new(options)?;
//!
//! // After login
//! client.set_tokens("access", "refresh").await?;
//!
//! let response = client.get("/users/me").await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Custom refresh and session events
//!
//! ```no_run
//! use bearer_guard::{AuthClient, AuthClientOptions, ClearReason, SessionEvent};
//! use bearer_guard::auth::MemoryTokenStore;
//! use bearer_guard::types::TokenPair;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = AuthClientOptions::builder()
//!     .base_url("https://api.example.com")
//!     .build();
//! let client = AuthClient::builder(options)
//!     .store(MemoryTokenStore::new())
//!     .refresh_fn(|refresh_token| async move {
//!         let _ = refresh_token;
//!         Ok(TokenPair::new("new-access", "new-refresh"))
//!     })
//!     .build()?;
//!
//! let mut events = client.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         if event == (SessionEvent::Cleared { reason: ClearReason::RefreshFailed }) {
//!             println!("Session expired, back to login");
//!         }
//!     }
//! });
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::auth::{
    FileTokenStore, RefreshError, RefreshStrategy, SecureTokenStore, SessionCache,
    SharedTokenStore,
};
use crate::callbacks::{RefreshCallback, SharedRefreshCallback, refresh_fn};
use crate::error::Result;
use crate::events::{ClearReason, SessionEvent};
use crate::interceptor::AuthInterceptor;
use crate::transport::{HttpTransport, SharedTransport, Transport, TransportError};
use crate::types::{AuthClientOptions, HttpRequest, HttpResponse, TokenPair};

/// Builder for [`AuthClient`]
pub struct AuthClientBuilder {
    options: AuthClientOptions,
    store: Option<SharedTokenStore>,
    transport: Option<SharedTransport>,
    refresh_transport: Option<SharedTransport>,
    refresh_callback: Option<SharedRefreshCallback>,
}

impl AuthClientBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new(options: AuthClientOptions) -> Self {
        Self {
            options,
            store: None,
            transport: None,
            refresh_transport: None,
            refresh_callback: None,
        }
    }

    /// Set the secure token store (default: [`FileTokenStore::new`])
    #[must_use]
    pub fn store(self, store: impl SecureTokenStore + 'static) -> Self {
        self.shared_store(Arc::new(store))
    }

    /// Set an already shared secure token store
    #[must_use]
    pub fn shared_store(mut self, store: SharedTokenStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the primary transport (default: [`HttpTransport`] from the options)
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set the transport used only for refresh calls (default: a separate
    /// [`HttpTransport`] from the options).
    ///
    /// Must not be the primary transport or anything wrapping this client.
    #[must_use]
    pub fn refresh_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.refresh_transport = Some(Arc::new(transport));
        self
    }

    /// Use a custom refresh callback; takes precedence over `refresh_path`
    #[must_use]
    pub fn refresh_callback(mut self, callback: impl RefreshCallback + 'static) -> Self {
        self.refresh_callback = Some(Arc::new(callback));
        self
    }

    /// Use an async closure as the refresh callback
    #[must_use]
    pub fn refresh_fn<F, Fut>(mut self, func: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<TokenPair, RefreshError>> + Send + 'static,
    {
        self.refresh_callback = Some(refresh_fn(func));
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidConfig` or `ClientError::InvalidHeader`
    /// if a default transport cannot be built from the options.
    pub fn build(self) -> Result<AuthClient> {
        let transport: SharedTransport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::from_options(&self.options)?),
        };
        // Built separately so it never shares anything with the primary
        let refresh_transport: SharedTransport = match self.refresh_transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::from_options(&self.options)?),
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(FileTokenStore::new()));

        let strategy =
            RefreshStrategy::resolve(self.refresh_callback, self.options.refresh_path.as_deref());
        let session = Arc::new(SessionCache::new(
            store,
            self.options.storage_keys.clone(),
        ));

        tracing::debug!(
            base_url = %self.options.base_url,
            strategy = strategy.name(),
            coalesce_refresh = self.options.coalesce_refresh,
            "Building AuthClient"
        );

        let interceptor = Arc::new(AuthInterceptor::new(
            session.clone(),
            strategy,
            refresh_transport,
            self.options.coalesce_refresh,
            self.options.timeout,
        ));

        Ok(AuthClient {
            transport,
            interceptor,
            session,
        })
    }
}

/// Authenticated HTTP client with cached tokens and automatic refresh.
///
/// Clone is cheap and clones share one session.
#[derive(Clone)]
pub struct AuthClient {
    transport: SharedTransport,
    interceptor: Arc<AuthInterceptor>,
    session: Arc<SessionCache>,
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("interceptor", &self.interceptor)
            .finish_non_exhaustive()
    }
}

impl AuthClient {
    /// Create a client with default transports and the default file store
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transports cannot be built from `options`.
    pub fn new(options: AuthClientOptions) -> Result<Self> {
        AuthClientBuilder::new(options).build()
    }

    /// Create a builder for custom stores, transports or refresh callbacks
    #[must_use]
    pub fn builder(options: AuthClientOptions) -> AuthClientBuilder {
        AuthClientBuilder::new(options)
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Send a request through the interceptor
    ///
    /// # Errors
    ///
    /// Returns the transport error for non-401 failures, the original 401 if
    /// the session could not be refreshed, or the retry's error.
    pub async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.send_with_cancellation(request, &CancellationToken::new())
            .await
    }

    /// Send a request that can be cancelled.
    ///
    /// Cancelling before a 401 arrives means no refresh happens. Cancelling
    /// during the refresh lets the refresh finish but skips the retry.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send), plus a `Cancelled` transport error.
    pub async fn send_with_cancellation(
        &self,
        mut request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        if cancel.is_cancelled() {
            return Err(TransportError::cancelled("request cancelled").into());
        }

        self.interceptor.on_request(&mut request).await?;

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(path = %request.path, "Request cancelled");
                return Err(TransportError::cancelled("request cancelled").into());
            }
            result = self.transport.send(&request) => result,
        };

        match outcome {
            Ok(response) => Ok(response),
            Err(error) => {
                self.interceptor
                    .on_response_error(&request, error, self.transport.as_ref(), cancel)
                    .await
            }
        }
    }

    /// `GET path`
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn get(&self, path: impl Into<String>) -> Result<HttpResponse> {
        self.send(HttpRequest::get(path)).await
    }

    /// `DELETE path`
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn delete(&self, path: impl Into<String>) -> Result<HttpResponse> {
        self.send(HttpRequest::delete(path)).await
    }

    /// `POST path` with a JSON body
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Json` if `body` cannot be serialized, otherwise
    /// see [`send`](Self::send).
    pub async fn post<T: Serialize + ?Sized>(
        &self,
        path: impl Into<String>,
        body: &T,
    ) -> Result<HttpResponse> {
        self.send_json(Method::POST, path, body).await
    }

    /// `PUT path` with a JSON body
    ///
    /// # Errors
    ///
    /// See [`post`](Self::post).
    pub async fn put<T: Serialize + ?Sized>(
        &self,
        path: impl Into<String>,
        body: &T,
    ) -> Result<HttpResponse> {
        self.send_json(Method::PUT, path, body).await
    }

    /// `PATCH path` with a JSON body
    ///
    /// # Errors
    ///
    /// See [`post`](Self::post).
    pub async fn patch<T: Serialize + ?Sized>(
        &self,
        path: impl Into<String>,
        body: &T,
    ) -> Result<HttpResponse> {
        self.send_json(Method::PATCH, path, body).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: impl Into<String>,
        body: &T,
    ) -> Result<HttpResponse> {
        let request = HttpRequest::new(method, path).with_json(body)?;
        self.send(request).await
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Force hydration from secure storage.
    ///
    /// Use before a definitive `access_token()` check during cold start.
    pub async fn hydrate(&self) {
        self.session.ensure_hydrated().await;
    }

    /// Store a new token pair (e.g. after login)
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the tokens cannot be persisted.
    pub async fn set_tokens(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<()> {
        self.session
            .set_tokens(TokenPair::new(access_token, refresh_token))
            .await?;
        Ok(())
    }

    /// Replace only the access token
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the token cannot be persisted.
    pub async fn set_access_token(&self, access_token: impl Into<String>) -> Result<()> {
        self.session.set_access_token(access_token).await?;
        Ok(())
    }

    /// Replace only the refresh token
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the token cannot be persisted.
    pub async fn set_refresh_token(&self, refresh_token: impl Into<String>) -> Result<()> {
        self.session.set_refresh_token(refresh_token).await?;
        Ok(())
    }

    /// Log out: drop both tokens from memory and secure storage
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if a stored token cannot be deleted.
    pub async fn clear_tokens(&self) -> Result<()> {
        self.session.clear(ClearReason::Logout).await?;
        Ok(())
    }

    /// Cached access token, without I/O
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.session.access_token()
    }

    /// Cached refresh token, without I/O
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.session.refresh_token()
    }

    /// Whether an access token is cached, or failing that, stored
    pub async fn is_authenticated(&self) -> bool {
        self.session.is_authenticated().await
    }

    /// Subscribe to session lifecycle events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    /// The shared session cache
    #[must_use]
    pub fn session(&self) -> &Arc<SessionCache> {
        &self.session
    }

    /// The interceptor requests run through
    #[must_use]
    pub fn interceptor(&self) -> &Arc<AuthInterceptor> {
        &self.interceptor
    }
}
