//! Outgoing request descriptor

use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;

use crate::error::{ClientError, Result};

/// Authorization scheme prefix used for injected tokens
const BEARER_PREFIX: &str = "Bearer ";

/// An outgoing HTTP request: method, path, headers and optional JSON body.
///
/// The path is relative to the transport's base URL. Requests are cheap to
/// clone so the interceptor can resubmit the original after a refresh.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL (e.g. `/users/me`)
    pub path: String,
    /// Request headers
    pub headers: HeaderMap,
    /// JSON body, if any
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Create a request with no headers and no body
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// `GET path`
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST path`
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT path`
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `PATCH path`
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// `DELETE path`
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a raw JSON body
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize `body` as the JSON body
    ///
    /// # Errors
    /// Returns `ClientError::Json` if serialization fails.
    pub fn with_json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        Ok(self.with_body(serde_json::to_value(body)?))
    }

    /// Add or replace a header
    ///
    /// # Errors
    /// Returns `ClientError::InvalidHeader` if the name or value is not valid.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::invalid_header(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::invalid_header(format!("{name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// The bearer token currently carried in the `Authorization` header
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
    }

    /// Set `Authorization: Bearer <token>`, replacing any existing value.
    ///
    /// The header is marked sensitive so it is omitted from `Debug` output.
    ///
    /// # Errors
    /// Returns `ClientError::InvalidHeader` if the token contains characters
    /// that cannot appear in a header value.
    pub fn set_bearer_token(&mut self, token: &str) -> Result<()> {
        let value = bearer_header_value(token)?;
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Whether `token` can be sent as `Authorization: Bearer <token>`
    #[must_use]
    pub fn is_valid_bearer_token(token: &str) -> bool {
        bearer_header_value(token).is_ok()
    }

    /// Remove the `Authorization` header
    pub fn clear_authorization(&mut self) {
        self.headers.remove(AUTHORIZATION);
    }
}

fn bearer_header_value(token: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("{BEARER_PREFIX}{token}"))
        .map_err(|e| ClientError::invalid_header(format!("authorization: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}
