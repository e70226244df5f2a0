//! Client configuration options

use std::collections::HashMap;
use std::time::Duration;
use typed_builder::TypedBuilder;

use super::tokens::StorageKeys;

/// Default per-request timeout, applied to ordinary requests, refresh and retry
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`AuthClient`](crate::AuthClient)
///
/// # Example
///
/// ```
/// use bearer_guard::AuthClientOptions;
/// use std::time::Duration;
///
/// let options = AuthClientOptions::builder()
///     .base_url("https://api.example.com")
///     .refresh_path("/auth/refresh")
///     .timeout(Duration::from_secs(10))
///     .build();
///
/// assert!(options.coalesce_refresh);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
#[builder(
    builder_method(doc = "Create a new builder for AuthClientOptions"),
    builder_type(doc = "Builder for AuthClientOptions", vis = "pub"),
    build_method(doc = "Build the AuthClientOptions")
)]
pub struct AuthClientOptions {
    /// Base URL every request path is joined to
    #[builder(setter(into))]
    pub base_url: String,

    /// Per-request timeout (default: 30s)
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,

    /// Path of the refresh endpoint; enables endpoint-based refresh.
    /// Ignored when a refresh callback is supplied to the client builder.
    #[builder(default, setter(strip_option, into))]
    pub refresh_path: Option<String>,

    /// Share one in-flight refresh between concurrent 401s (default: true).
    /// `false` lets every failing request run its own refresh.
    #[builder(default = true)]
    pub coalesce_refresh: bool,

    /// Secure store keys for the two tokens
    #[builder(default)]
    pub storage_keys: StorageKeys,

    /// Headers added to every request (request headers win on conflict)
    #[builder(default)]
    pub default_headers: HashMap<String, String>,

    /// User-Agent sent by the HTTP transports
    #[builder(default, setter(strip_option, into))]
    pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AuthClientOptions::builder()
            .base_url("https://api.example.com")
            .build();

        assert_eq!(options.timeout, DEFAULT_TIMEOUT);
        assert!(options.refresh_path.is_none());
        assert!(options.coalesce_refresh);
        assert_eq!(options.storage_keys, StorageKeys::default());
        assert!(options.default_headers.is_empty());
        assert!(options.user_agent.is_none());
    }

    #[test]
    fn test_overrides() {
        let options = AuthClientOptions::builder()
            .base_url("https://api.example.com")
            .refresh_path("/auth/refresh")
            .coalesce_refresh(false)
            .user_agent("my-app/1.0")
            .storage_keys(StorageKeys::new("at", "rt"))
            .build();

        assert_eq!(options.refresh_path.as_deref(), Some("/auth/refresh"));
        assert!(!options.coalesce_refresh);
        assert_eq!(options.user_agent.as_deref(), Some("my-app/1.0"));
        assert_eq!(options.storage_keys.access_token, "at");
    }
}
