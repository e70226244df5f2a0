//! Transport layer for issuing HTTP requests
//!
//! This module provides the transport abstraction the interceptor sits in
//! front of, the error classification every transport reports, and the
//! reqwest-backed [`HttpTransport`].
//!
//! A transport never carries the auth interceptor itself. That is what lets
//! the same trait serve both the primary transport and the dedicated
//! refresh transport without the refresh call being intercepted.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{HttpRequest, HttpResponse};
use crate::utils::truncate_body;

/// Classification of a transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// The request exceeded its timeout
    Timeout,
    /// The connection could not be established or was dropped
    Connection,
    /// The caller cancelled the request
    Cancelled,
    /// The server answered with a non-2xx status
    BadResponse {
        /// HTTP status code
        status: u16,
    },
    /// Anything else
    Unknown,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connection => write!(f, "connection error"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::BadResponse { status } => write!(f, "bad response (status {status})"),
            Self::Unknown => write!(f, "unknown error"),
        }
    }
}

/// Failure reported by a [`Transport`]
///
/// `BadResponse` errors keep the full response so callers can still read
/// the body of, say, the original 401.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
    response: Option<Box<HttpResponse>>,
}

impl TransportError {
    /// Create an error of the given kind
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            response: None,
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connection, message)
    }

    /// Create a cancellation error
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Cancelled, message)
    }

    /// Create an unclassified error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unknown, message)
    }

    /// Wrap a non-2xx response
    #[must_use]
    pub fn bad_response(response: HttpResponse) -> Self {
        Self {
            kind: TransportErrorKind::BadResponse {
                status: response.status.as_u16(),
            },
            message: truncate_body(&response.text()),
            response: Some(Box::new(response)),
        }
    }

    /// Error classification
    #[must_use]
    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    /// Human-readable detail
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The server's response, for `BadResponse` errors
    #[must_use]
    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_deref()
    }

    /// Take ownership of the server's response
    #[must_use]
    pub fn into_response(self) -> Option<HttpResponse> {
        self.response.map(|response| *response)
    }

    /// HTTP status for `BadResponse` errors
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            TransportErrorKind::BadResponse { status } => Some(status),
            _ => None,
        }
    }

    /// True for `BadResponse { status: 401 }`, the only refresh trigger
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// Transport trait for issuing HTTP requests
///
/// Implementations report every non-2xx response as
/// `TransportErrorKind::BadResponse`, and apply their own timeout so a
/// stalled request eventually fails.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and read the full response
    ///
    /// # Errors
    /// Returns a classified `TransportError` on failure or non-2xx status.
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl Transport for Box<dyn Transport> {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

/// Type alias for a shared transport
pub type SharedTransport = Arc<dyn Transport>;

pub use http::HttpTransport;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_bad_response_keeps_response() {
        let response = HttpResponse::new(StatusCode::UNAUTHORIZED, b"token expired".to_vec());
        let err = TransportError::bad_response(response);

        assert_eq!(err.kind(), TransportErrorKind::BadResponse { status: 401 });
        assert_eq!(err.status(), Some(401));
        assert!(err.is_unauthorized());
        assert_eq!(err.message(), "token expired");
        assert_eq!(err.response().unwrap().text(), "token expired");
        assert_eq!(
            err.to_string(),
            "bad response (status 401): token expired"
        );
    }

    #[test]
    fn test_forbidden_is_not_unauthorized() {
        let err = TransportError::bad_response(HttpResponse::new(StatusCode::FORBIDDEN, Vec::new()));
        assert!(!err.is_unauthorized());
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn test_non_response_kinds() {
        for err in [
            TransportError::timeout("slow"),
            TransportError::connection("refused"),
            TransportError::cancelled("gone"),
            TransportError::unknown("?"),
        ] {
            assert_eq!(err.status(), None);
            assert!(err.response().is_none());
            assert!(!err.is_unauthorized());
        }
        assert_eq!(TransportError::timeout("slow").to_string(), "timeout: slow");
    }
}
