//! Token injection and 401 recovery
//!
//! [`AuthInterceptor`] exposes the three seams an HTTP client needs:
//!
//! ```text
//!   on_request ──> Transport ──> 2xx ─────────────────────────────> caller
//!                      │
//!                      └─> error ──> on_response_error
//!                                       │ not 401 ───────────────> caller
//!                                       │ 401
//!                                       ├─> refresh ok ──> retry once ─> caller
//!                                       └─> refresh failed ─> clear ─> original 401
//! ```
//!
//! The refresh call goes through a separate transport that does not carry
//! this interceptor, so a 401 from the refresh endpoint can never recurse.
//!
//! With coalescing on, concurrent 401s for the same token serialize on one
//! lock: the first performs the refresh, later ones see the token has
//! already moved on and retry with it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::auth::{RefreshError, RefreshStrategy, SessionCache};
use crate::error::{ClientError, Result};
use crate::events::ClearReason;
use crate::transport::{SharedTransport, Transport, TransportError};
use crate::types::{HttpRequest, HttpResponse, TokenPair};
use crate::utils::{redact_optional, redact_token};

/// Request interceptor owning the refresh-and-retry state machine
pub struct AuthInterceptor {
    session: Arc<SessionCache>,
    strategy: RefreshStrategy,
    refresh_transport: SharedTransport,
    coalesce: bool,
    refresh_timeout: Duration,
    /// Held for the whole refresh when coalescing
    refresh_lock: Mutex<()>,
    refresh_attempts: AtomicUsize,
}

impl std::fmt::Debug for AuthInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthInterceptor")
            .field("session", &self.session)
            .field("strategy", &self.strategy)
            .field("coalesce", &self.coalesce)
            .field("refresh_timeout", &self.refresh_timeout)
            .finish_non_exhaustive()
    }
}

impl AuthInterceptor {
    /// Create an interceptor.
    ///
    /// `refresh_transport` must be a different instance from the transport
    /// requests are sent through.
    pub fn new(
        session: Arc<SessionCache>,
        strategy: RefreshStrategy,
        refresh_transport: SharedTransport,
        coalesce: bool,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            session,
            strategy,
            refresh_transport,
            coalesce,
            refresh_timeout,
            refresh_lock: Mutex::new(()),
            refresh_attempts: AtomicUsize::new(0),
        }
    }

    /// Shared session state
    #[must_use]
    pub fn session(&self) -> &Arc<SessionCache> {
        &self.session
    }

    /// Resolved refresh strategy
    #[must_use]
    pub fn strategy(&self) -> &RefreshStrategy {
        &self.strategy
    }

    /// Number of refresh strategy invocations so far
    #[must_use]
    pub fn refresh_attempts(&self) -> usize {
        self.refresh_attempts.load(Ordering::SeqCst)
    }

    /// Hydrate on first use, then attach the cached access token.
    ///
    /// A missing token is not an error; the request goes out unauthenticated.
    ///
    /// # Errors
    /// Returns `ClientError::InvalidHeader` if the cached token cannot be
    /// encoded as a header value.
    pub async fn on_request(&self, request: &mut HttpRequest) -> Result<()> {
        self.session.ensure_hydrated().await;

        let state = self.session.snapshot();
        if let Some(token) = state.usable_access_token() {
            request.set_bearer_token(token)?;
            tracing::trace!(
                method = %request.method,
                path = %request.path,
                token = %redact_token(token),
                "Attached bearer token"
            );
        }
        Ok(())
    }

    /// Handle a failed request.
    ///
    /// Non-401 errors pass through unchanged. A 401 triggers at most one
    /// refresh and at most one retry through `retry`; the retry's outcome is
    /// final. If no fresh token can be obtained the session is cleared and
    /// the original 401 is returned.
    ///
    /// # Errors
    /// Returns the original error, the retry's error, or a `Cancelled`
    /// transport error when `cancel` fires before the retry completes.
    pub async fn on_response_error(
        &self,
        request: &HttpRequest,
        error: TransportError,
        retry: &dyn Transport,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        if !error.is_unauthorized() {
            return Err(error.into());
        }
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let sent_token = request.bearer_token();
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            token = %redact_optional(sent_token),
            "Request unauthorized, attempting token refresh"
        );

        let token = match self.obtain_fresh_token(sent_token).await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    strategy = self.strategy.name(),
                    "Token refresh failed, surfacing original 401"
                );
                return Err(error.into());
            }
        };

        // The refresh is shared state; only the retry belongs to this caller
        if cancel.is_cancelled() {
            tracing::debug!(path = %request.path, "Request cancelled during refresh, skipping retry");
            return Err(cancelled());
        }

        let mut retry_request = request.clone();
        retry_request.set_bearer_token(&token)?;
        tracing::debug!(
            method = %retry_request.method,
            path = %retry_request.path,
            token = %redact_token(&token),
            "Retrying request with refreshed token"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(cancelled()),
            result = retry.send(&retry_request) => result.map_err(ClientError::from),
        }
    }

    /// Produce an access token newer than `sent_token`, refreshing if needed.
    ///
    /// Every failure path leaves the session cleared.
    async fn obtain_fresh_token(&self, sent_token: Option<&str>) -> std::result::Result<String, RefreshError> {
        let _guard = if self.coalesce {
            Some(self.refresh_lock.lock().await)
        } else {
            None
        };

        let state = self.session.snapshot();
        if self.coalesce {
            if let Some(current) = state.usable_access_token().filter(|t| Some(*t) != sent_token) {
                tracing::debug!(
                    token = %redact_token(current),
                    "Reusing token from a concurrent refresh"
                );
                return Ok(current.to_string());
            }
        }

        let Some(refresh_token) = state.usable_refresh_token().map(str::to_owned) else {
            self.clear_after_failure().await;
            return Err(RefreshError::NoRefreshToken);
        };

        self.refresh_attempts.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            strategy = self.strategy.name(),
            refresh_token = %redact_token(&refresh_token),
            "Refreshing access token"
        );

        let refresh = self
            .strategy
            .refresh(&refresh_token, self.refresh_transport.as_ref());
        let outcome = match tokio::time::timeout(self.refresh_timeout, refresh).await {
            Ok(outcome) => outcome,
            Err(_) => Err(RefreshError::TimedOut(self.refresh_timeout)),
        };

        let pair = match outcome.and_then(check_refreshed_pair) {
            Ok(pair) => pair,
            Err(e) => {
                self.clear_after_failure().await;
                return Err(e);
            }
        };

        if let Err(e) = self.session.apply_refresh(pair.clone()).await {
            self.clear_after_failure().await;
            return Err(e.into());
        }

        tracing::debug!(
            token = %redact_token(&pair.access_token),
            "Token refresh succeeded"
        );

        // Without coalescing another refresh may have landed in the meantime
        Ok(self
            .session
            .snapshot()
            .usable_access_token()
            .map_or(pair.access_token, str::to_owned))
    }

    async fn clear_after_failure(&self) {
        if let Err(e) = self.session.clear(ClearReason::RefreshFailed).await {
            tracing::warn!(error = %e, "Failed to clear tokens from secure storage");
        }
    }
}

/// Reject a refreshed pair with an empty token or an access token that
/// cannot be sent as a header value
fn check_refreshed_pair(pair: TokenPair) -> std::result::Result<TokenPair, RefreshError> {
    if pair.access_token.is_empty() || pair.refresh_token.is_empty() {
        return Err(RefreshError::malformed("refresh produced an empty token"));
    }
    if !HttpRequest::is_valid_bearer_token(&pair.access_token) {
        return Err(RefreshError::malformed(
            "refreshed access token is not a valid header value",
        ));
    }
    Ok(pair)
}

fn cancelled() -> ClientError {
    TransportError::cancelled("request cancelled").into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use crate::callbacks::refresh_fn;
    use crate::types::StorageKeys;
    use async_trait::async_trait;
    use reqwest::StatusCode;

    /// Returns 200 for `Bearer good`, 401 for anything else
    struct GoodTokenOnly;

    #[async_trait]
    impl Transport for GoodTokenOnly {
        async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
            if request.bearer_token() == Some("good") {
                Ok(HttpResponse::new(StatusCode::OK, b"ok".to_vec()))
            } else {
                Err(TransportError::bad_response(HttpResponse::new(
                    StatusCode::UNAUTHORIZED,
                    b"expired".to_vec(),
                )))
            }
        }
    }

    fn interceptor(strategy: RefreshStrategy) -> AuthInterceptor {
        let store = Arc::new(MemoryTokenStore::new());
        let session = Arc::new(SessionCache::new(store, StorageKeys::default()));
        AuthInterceptor::new(
            session,
            strategy,
            Arc::new(GoodTokenOnly),
            true,
            Duration::from_secs(5),
        )
    }

    fn unauthorized() -> TransportError {
        TransportError::bad_response(HttpResponse::new(StatusCode::UNAUTHORIZED, b"expired".to_vec()))
    }

    #[tokio::test]
    async fn test_on_request_without_token_leaves_header_off() {
        let interceptor = interceptor(RefreshStrategy::Disabled);
        let mut request = HttpRequest::get("/me");
        interceptor.on_request(&mut request).await.unwrap();
        assert_eq!(request.bearer_token(), None);
        assert!(interceptor.session().is_initialized());
    }

    #[tokio::test]
    async fn test_on_request_injects_cached_token() {
        let interceptor = interceptor(RefreshStrategy::Disabled);
        interceptor
            .session()
            .set_tokens(TokenPair::new("A1", "R1"))
            .await
            .unwrap();

        let mut request = HttpRequest::get("/me");
        interceptor.on_request(&mut request).await.unwrap();
        assert_eq!(request.bearer_token(), Some("A1"));
    }

    #[tokio::test]
    async fn test_non_401_passes_through() {
        let interceptor = interceptor(RefreshStrategy::Disabled);
        let err = interceptor
            .on_response_error(
                &HttpRequest::get("/me"),
                TransportError::timeout("slow"),
                &GoodTokenOnly,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.as_transport().map(TransportError::kind),
            Some(crate::transport::TransportErrorKind::Timeout)
        );
        assert_eq!(interceptor.refresh_attempts(), 0);
    }

    #[tokio::test]
    async fn test_refresh_then_retry() {
        let interceptor = interceptor(RefreshStrategy::Custom(refresh_fn(|_| async {
            Ok(TokenPair::new("good", "R2"))
        })));
        interceptor
            .session()
            .set_tokens(TokenPair::new("stale", "R1"))
            .await
            .unwrap();

        let mut request = HttpRequest::get("/me");
        interceptor.on_request(&mut request).await.unwrap();
        let response = interceptor
            .on_response_error(&request, unauthorized(), &GoodTokenOnly, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.text(), "ok");
        assert_eq!(interceptor.session().refresh_token().as_deref(), Some("R2"));
    }

    #[tokio::test]
    async fn test_empty_refreshed_token_is_failure() {
        let interceptor = interceptor(RefreshStrategy::Custom(refresh_fn(|_| async {
            Ok(TokenPair::new("", "R2"))
        })));
        interceptor
            .session()
            .set_tokens(TokenPair::new("stale", "R1"))
            .await
            .unwrap();

        let mut request = HttpRequest::get("/me");
        interceptor.on_request(&mut request).await.unwrap();
        let err = interceptor
            .on_response_error(&request, unauthorized(), &GoodTokenOnly, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(interceptor.refresh_attempts(), 1);
        assert_eq!(interceptor.session().access_token(), None);
        assert_eq!(interceptor.session().refresh_token(), None);
    }

    #[tokio::test]
    async fn test_unsendable_refreshed_token_is_failure() {
        let interceptor = interceptor(RefreshStrategy::Custom(refresh_fn(|_| async {
            Ok(TokenPair::new("bad\ntoken", "R2"))
        })));
        interceptor
            .session()
            .set_tokens(TokenPair::new("stale", "R1"))
            .await
            .unwrap();

        let mut request = HttpRequest::get("/me");
        interceptor.on_request(&mut request).await.unwrap();
        let err = interceptor
            .on_response_error(&request, unauthorized(), &GoodTokenOnly, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(interceptor.session().access_token(), None);

        // The next request goes out unauthenticated rather than failing locally
        let mut next = HttpRequest::get("/me");
        interceptor.on_request(&mut next).await.unwrap();
        assert_eq!(next.bearer_token(), None);
    }

    #[tokio::test]
    async fn test_cancelled_before_refresh() {
        let interceptor = interceptor(RefreshStrategy::Custom(refresh_fn(|_| async {
            Ok(TokenPair::new("good", "R2"))
        })));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = interceptor
            .on_response_error(&HttpRequest::get("/me"), unauthorized(), &GoodTokenOnly, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(interceptor.refresh_attempts(), 0);
    }
}
