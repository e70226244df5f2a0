//! Error types for bearer-guard

use thiserror::Error;

use crate::auth::StorageError;
use crate::transport::{TransportError, TransportErrorKind};

/// Main error type for bearer-guard
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure, including non-2xx responses.
    ///
    /// A request that could not be authorized surfaces here as
    /// `TransportErrorKind::BadResponse { status: 401 }` carrying the
    /// original response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Secure token store failure
    #[error("Token storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Header name or value could not be encoded
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for bearer-guard operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid header error
    pub fn invalid_header(msg: impl Into<String>) -> Self {
        Self::InvalidHeader(msg.into())
    }

    /// The transport error, if this is one
    #[must_use]
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP status of the failed response, if the server answered
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.as_transport().and_then(TransportError::status)
    }

    /// True when the request could not be authorized.
    ///
    /// Applications should treat the user as logged out when they see this.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.as_transport().is_some_and(TransportError::is_unauthorized)
    }

    /// True when the caller cancelled the request
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.as_transport()
            .is_some_and(|err| err.kind() == TransportErrorKind::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpResponse;
    use reqwest::StatusCode;

    #[test]
    fn test_unauthorized_detection() {
        let response = HttpResponse::new(StatusCode::UNAUTHORIZED, b"expired".to_vec());
        let err = ClientError::from(TransportError::bad_response(response));

        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(401));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_non_transport_errors_have_no_status() {
        let err = ClientError::invalid_config("missing base url");
        assert_eq!(err.status(), None);
        assert!(!err.is_unauthorized());
        assert_eq!(err.to_string(), "Invalid configuration: missing base url");
    }

    #[test]
    fn test_cancelled_detection() {
        let err = ClientError::from(TransportError::cancelled("caller gave up"));
        assert!(err.is_cancelled());
        assert!(!err.is_unauthorized());
    }
}
