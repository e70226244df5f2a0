//! Trait-based callback for custom token refresh.
//!
//! Applications whose refresh flow is not a plain `POST {refresh_token}`
//! (an OAuth token endpoint, a GraphQL mutation, a platform SDK) plug it in
//! here. Implement [`RefreshCallback`] on a type, or wrap an async closure
//! with [`refresh_fn`].
//!
//! # Example: Implementing `RefreshCallback`
//!
//! ```no_run
//! use bearer_guard::auth::RefreshError;
//! use bearer_guard::callbacks::RefreshCallback;
//! use bearer_guard::types::TokenPair;
//! use async_trait::async_trait;
//!
//! struct StaticRefresh;
//!
//! #[async_trait]
//! impl RefreshCallback for StaticRefresh {
//!     async fn refresh(&self, refresh_token: String) -> Result<TokenPair, RefreshError> {
//!         if refresh_token.starts_with("revoked") {
//!             return Err(RefreshError::callback("refresh token revoked"));
//!         }
//!         Ok(TokenPair::new("new-access", "new-refresh"))
//!     }
//! }
//! ```
//!
//! # Example: Using a closure
//!
//! ```no_run
//! use bearer_guard::callbacks::refresh_fn;
//! use bearer_guard::types::TokenPair;
//!
//! let callback = refresh_fn(|refresh_token| async move {
//!     let _ = refresh_token;
//!     Ok(TokenPair::new("new-access", "new-refresh"))
//! });
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::RefreshError;
use crate::types::TokenPair;

// ============================================================================
// Refresh Callback Trait
// ============================================================================

/// Trait for custom refresh strategies.
///
/// Called with the current refresh token whenever a request is rejected
/// with 401. Any `Err` is treated as a refresh failure: the session is
/// cleared and the caller sees the original 401.
#[async_trait]
pub trait RefreshCallback: Send + Sync {
    /// Exchange `refresh_token` for a new token pair.
    ///
    /// # Arguments
    ///
    /// * `refresh_token` - The refresh token currently held by the session
    ///
    /// # Returns
    ///
    /// The new access and refresh tokens, which replace the session.
    async fn refresh(&self, refresh_token: String) -> Result<TokenPair, RefreshError>;
}

// Blanket implementation for boxed trait objects
#[async_trait]
impl RefreshCallback for Box<dyn RefreshCallback> {
    async fn refresh(&self, refresh_token: String) -> Result<TokenPair, RefreshError> {
        (**self).refresh(refresh_token).await
    }
}

#[async_trait]
impl<T: RefreshCallback + ?Sized> RefreshCallback for Arc<T> {
    async fn refresh(&self, refresh_token: String) -> Result<TokenPair, RefreshError> {
        (**self).refresh(refresh_token).await
    }
}

/// Type alias for a shared refresh callback
pub type SharedRefreshCallback = Arc<dyn RefreshCallback>;

// ============================================================================
// Function-based Callback
// ============================================================================

/// Boxed future returned by [`FnRefreshCallback`]'s inner function
pub type RefreshFuture = Pin<Box<dyn Future<Output = Result<TokenPair, RefreshError>> + Send>>;

/// Wrapper for function-based refresh callbacks.
///
/// Allows using closures as refresh callbacks.
pub struct FnRefreshCallback<F>
where
    F: Fn(String) -> RefreshFuture + Send + Sync,
{
    func: F,
}

impl<F> FnRefreshCallback<F>
where
    F: Fn(String) -> RefreshFuture + Send + Sync,
{
    /// Create a new function-based refresh callback
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> RefreshCallback for FnRefreshCallback<F>
where
    F: Fn(String) -> RefreshFuture + Send + Sync,
{
    async fn refresh(&self, refresh_token: String) -> Result<TokenPair, RefreshError> {
        (self.func)(refresh_token).await
    }
}

/// Wrap an async closure as a [`SharedRefreshCallback`]
pub fn refresh_fn<F, Fut>(func: F) -> SharedRefreshCallback
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<TokenPair, RefreshError>> + Send + 'static,
{
    Arc::new(FnRefreshCallback::new(move |token: String| -> RefreshFuture {
        Box::pin(func(token))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Rotating;

    #[async_trait]
    impl RefreshCallback for Rotating {
        async fn refresh(&self, refresh_token: String) -> Result<TokenPair, RefreshError> {
            Ok(TokenPair::new(
                format!("access-for-{refresh_token}"),
                format!("{refresh_token}-next"),
            ))
        }
    }

    #[tokio::test]
    async fn test_struct_callback() {
        let callback: Box<dyn RefreshCallback> = Box::new(Rotating);
        let pair = callback.refresh("R1".to_string()).await.unwrap();
        assert_eq!(pair.access_token, "access-for-R1");
        assert_eq!(pair.refresh_token, "R1-next");
    }

    #[tokio::test]
    async fn test_closure_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let callback = refresh_fn(move |token| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if token.is_empty() {
                    Err(RefreshError::callback("empty"))
                } else {
                    Ok(TokenPair::new("A2", "R2"))
                }
            }
        });

        assert_eq!(
            callback.refresh("R1".to_string()).await.unwrap(),
            TokenPair::new("A2", "R2")
        );
        assert!(matches!(
            callback.refresh(String::new()).await,
            Err(RefreshError::Callback(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
