//! Refresh strategies and the endpoint wire contract
//!
//! A [`RefreshStrategy`] is resolved once when the client is built:
//!
//! - `Custom` wraps a [`RefreshCallback`](crate::callbacks::RefreshCallback)
//!   and always wins when one is supplied.
//! - `Endpoint` POSTs `{"refresh_token": "..."}` to a path through the
//!   dedicated refresh transport and expects `access_token` and
//!   `refresh_token` string fields back.
//! - `Disabled` fails every refresh immediately.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use super::store::StorageError;
use crate::callbacks::SharedRefreshCallback;
use crate::transport::{Transport, TransportError};
use crate::types::{HttpRequest, TokenPair};

/// Why a refresh attempt failed.
///
/// Never returned from request methods: the interceptor logs it, clears the
/// session, and surfaces the original 401 instead.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The session holds no usable refresh token
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Neither a refresh path nor a refresh callback was configured
    #[error("No refresh strategy configured")]
    NotConfigured,

    /// The refresh request itself failed
    #[error("Refresh request failed: {0}")]
    Transport(#[source] TransportError),

    /// The refresh endpoint answered with an unexpected body
    #[error("Malformed refresh response: {0}")]
    MalformedResponse(String),

    /// A custom refresh callback reported failure
    #[error("Refresh callback failed: {0}")]
    Callback(String),

    /// The refresh did not finish in time
    #[error("Refresh timed out after {0:?}")]
    TimedOut(Duration),

    /// Refreshed tokens could not be persisted
    #[error("Failed to persist refreshed tokens: {0}")]
    Storage(#[from] StorageError),
}

impl RefreshError {
    /// Create a callback failure
    pub fn callback(msg: impl Into<String>) -> Self {
        Self::Callback(msg.into())
    }

    /// Create a malformed-response failure
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}

/// How a new token pair is obtained
#[derive(Clone)]
pub enum RefreshStrategy {
    /// POST the refresh token to `path` via the refresh transport
    Endpoint {
        /// Path (or absolute URL) of the refresh endpoint
        path: String,
    },
    /// Hand the refresh token to an application-supplied callback
    Custom(SharedRefreshCallback),
    /// Every refresh fails with [`RefreshError::NotConfigured`]
    Disabled,
}

impl std::fmt::Debug for RefreshStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Endpoint { path } => f.debug_struct("Endpoint").field("path", path).finish(),
            Self::Custom(_) => f.write_str("Custom(<callback>)"),
            Self::Disabled => f.write_str("Disabled"),
        }
    }
}

impl RefreshStrategy {
    /// Pick the strategy from the configured inputs; a callback takes
    /// precedence over a path. Blank paths count as absent.
    #[must_use]
    pub fn resolve(callback: Option<SharedRefreshCallback>, path: Option<&str>) -> Self {
        match (callback, path.map(str::trim).filter(|p| !p.is_empty())) {
            (Some(callback), _) => Self::Custom(callback),
            (None, Some(path)) => Self::Endpoint {
                path: path.to_string(),
            },
            (None, None) => Self::Disabled,
        }
    }

    /// Short name for log fields
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Endpoint { .. } => "endpoint",
            Self::Custom(_) => "custom",
            Self::Disabled => "disabled",
        }
    }

    /// Whether a refresh can ever succeed
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    /// Exchange `refresh_token` for a new pair.
    ///
    /// `transport` is only used by the endpoint strategy and must not be the
    /// intercepted primary transport.
    ///
    /// # Errors
    /// Returns a [`RefreshError`] describing why no pair was obtained.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        transport: &dyn Transport,
    ) -> Result<TokenPair, RefreshError> {
        match self {
            Self::Endpoint { path } => refresh_via_endpoint(path, refresh_token, transport).await,
            Self::Custom(callback) => callback.refresh(refresh_token.to_string()).await,
            Self::Disabled => Err(RefreshError::NotConfigured),
        }
    }
}

async fn refresh_via_endpoint(
    path: &str,
    refresh_token: &str,
    transport: &dyn Transport,
) -> Result<TokenPair, RefreshError> {
    let request = HttpRequest::post(path).with_body(serde_json::json!({
        "refresh_token": refresh_token,
    }));
    let response = transport
        .send(&request)
        .await
        .map_err(RefreshError::Transport)?;
    parse_refresh_response(&response.body)
}

/// Parse a refresh endpoint body into a [`TokenPair`].
///
/// The body must be a JSON object whose two token fields are non-empty
/// strings. Extra fields are ignored.
///
/// # Errors
/// Returns [`RefreshError::MalformedResponse`] for any other shape.
pub fn parse_refresh_response(body: &[u8]) -> Result<TokenPair, RefreshError> {
    let parsed: Value = serde_json::from_slice(body)
        .map_err(|e| RefreshError::malformed(format!("invalid JSON: {e}")))?;
    let Value::Object(fields) = parsed else {
        return Err(RefreshError::malformed("expected a JSON object"));
    };

    let string_field = |name: &str| {
        fields
            .get(name)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| RefreshError::malformed(format!("missing {name}")))
    };
    let access_token = string_field("access_token")?;
    let refresh_token = string_field("refresh_token")?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::refresh_fn;
    use crate::transport::TransportErrorKind;
    use crate::types::HttpResponse;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::Mutex;

    /// Answers every request with a fixed result and records what it saw
    struct Fixed {
        result: Result<HttpResponse, TransportError>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Fixed {
        fn new(result: Result<HttpResponse, TransportError>) -> Self {
            Self {
                result,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for Fixed {
        async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            self.result.clone()
        }
    }

    fn ok_json(value: serde_json::Value) -> Fixed {
        Fixed::new(Ok(HttpResponse::json_body(StatusCode::OK, &value)))
    }

    #[test]
    fn test_resolve_precedence() {
        let callback = refresh_fn(|_| async { Ok(TokenPair::new("A", "R")) });

        assert!(matches!(
            RefreshStrategy::resolve(Some(callback), Some("/auth/refresh")),
            RefreshStrategy::Custom(_)
        ));
        assert!(matches!(
            RefreshStrategy::resolve(None, Some("/auth/refresh")),
            RefreshStrategy::Endpoint { ref path } if path == "/auth/refresh"
        ));
        assert!(matches!(
            RefreshStrategy::resolve(None, Some("  ")),
            RefreshStrategy::Disabled
        ));
        assert!(!RefreshStrategy::resolve(None, None).is_enabled());
    }

    #[tokio::test]
    async fn test_endpoint_sends_refresh_token_body() {
        let transport = ok_json(serde_json::json!({
            "access_token": "A2",
            "refresh_token": "R2",
            "expires_in": 3600
        }));
        let strategy = RefreshStrategy::Endpoint {
            path: "/auth/refresh".to_string(),
        };

        let pair = strategy.refresh("R1", &transport).await.unwrap();
        assert_eq!(pair, TokenPair::new("A2", "R2"));

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, reqwest::Method::POST);
        assert_eq!(seen[0].path, "/auth/refresh");
        assert_eq!(
            seen[0].body,
            Some(serde_json::json!({"refresh_token": "R1"}))
        );
        assert_eq!(seen[0].bearer_token(), None);
    }

    #[tokio::test]
    async fn test_endpoint_missing_field_is_malformed() {
        let transport = ok_json(serde_json::json!({"access_token": "A2"}));
        let strategy = RefreshStrategy::Endpoint {
            path: "/auth/refresh".to_string(),
        };
        let err = strategy.refresh("R1", &transport).await.unwrap_err();
        assert!(matches!(err, RefreshError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_endpoint_transport_error() {
        let transport = Fixed::new(Err(TransportError::connection("refused")));
        let strategy = RefreshStrategy::Endpoint {
            path: "/auth/refresh".to_string(),
        };
        match strategy.refresh("R1", &transport).await {
            Err(RefreshError::Transport(e)) => assert_eq!(e.kind(), TransportErrorKind::Connection),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_disabled_fails() {
        let transport = ok_json(serde_json::json!({}));
        let err = RefreshStrategy::Disabled
            .refresh("R1", &transport)
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::NotConfigured));
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_parse_refresh_response_shapes() {
        assert!(parse_refresh_response(br#"{"access_token":"A","refresh_token":"R"}"#).is_ok());
        assert!(parse_refresh_response(br#"{"access_token":"","refresh_token":"R"}"#).is_err());
        assert!(parse_refresh_response(br#"{"access_token":1,"refresh_token":"R"}"#).is_err());
        assert!(parse_refresh_response(br#"["A","R"]"#).is_err());
        assert!(parse_refresh_response(br#""A""#).is_err());
        assert!(parse_refresh_response(b"null").is_err());
        assert!(parse_refresh_response(b"not json").is_err());
    }

    #[test]
    fn test_parse_refresh_response_rejects_arrays() {
        let err = parse_refresh_response(br#"["A2","R2"]"#).unwrap_err();
        assert!(matches!(err, RefreshError::MalformedResponse(ref msg) if msg.contains("object")));
    }
}
