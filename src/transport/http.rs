//! reqwest-backed transport
//!
//! Joins request paths onto a base URL, merges default headers, applies a
//! per-request timeout, and classifies reqwest failures into
//! [`TransportErrorKind`](super::TransportErrorKind)s.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::{Transport, TransportError};
use crate::error::{ClientError, Result};
use crate::types::{AuthClientOptions, HttpRequest, HttpResponse};

/// HTTP transport over a [`reqwest::Client`].
///
/// Clone is cheap - `reqwest::Client` uses Arc internally for connection pooling.
/// Two `HttpTransport`s built separately do not share anything, which is
/// what the refresh transport relies on.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    default_headers: HeaderMap,
}

impl HttpTransport {
    /// Create a transport with the given base URL and timeout
    ///
    /// # Errors
    /// Returns `ClientError::InvalidConfig` if the reqwest client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::invalid_config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a transport from client options (base URL, timeout, user agent,
    /// default headers)
    ///
    /// # Errors
    /// Returns `ClientError::InvalidConfig` for an empty base URL or if the
    /// reqwest client cannot be built, and `ClientError::InvalidHeader` for a
    /// malformed default header.
    pub fn from_options(options: &AuthClientOptions) -> Result<Self> {
        if options.base_url.trim().is_empty() {
            return Err(ClientError::invalid_config("base_url must not be empty"));
        }

        let mut builder = Client::builder().timeout(options.timeout);
        if let Some(ref user_agent) = options.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::invalid_config(format!("Failed to build HTTP client: {e}")))?;

        let mut transport = Self::with_client(client, options.base_url.clone());
        transport.default_headers = parse_headers(&options.default_headers)?;
        Ok(transport)
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            default_headers: HeaderMap::new(),
        }
    }

    /// Base URL request paths are joined to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a request path against the base URL.
    ///
    /// Absolute `http://` / `https://` paths are used unchanged.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Default headers overlaid with the request's own
    fn merged_headers(&self, request: &HttpRequest) -> HeaderMap {
        let mut headers = self.default_headers.clone();
        for name in request.headers.keys() {
            headers.remove(name);
        }
        headers.extend(request.headers.clone());
        headers
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        let url = self.url_for(&request.path);
        tracing::trace!(method = %request.method, url = %url, "Sending HTTP request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(self.merged_headers(request));
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(classify)?.to_vec();

        let response = HttpResponse {
            status,
            headers,
            body,
        };

        if response.is_success() {
            Ok(response)
        } else {
            tracing::debug!(
                method = %request.method,
                url = %url,
                status = status.as_u16(),
                "Request returned non-success status"
            );
            Err(TransportError::bad_response(response))
        }
    }
}

/// Map a reqwest error onto the transport error taxonomy
fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::connection(err.to_string())
    } else {
        TransportError::unknown(err.to_string())
    }
}

fn parse_headers(raw: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(raw.len());
    for (name, value) in raw {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::invalid_header(format!("{name}: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::invalid_header(format!("{name}: {e}")))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
