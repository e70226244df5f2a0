//! Token pair and storage key types

use serde::{Deserialize, Serialize};

use crate::utils::redact_token;

/// Default persistent-store key for the access token
pub const DEFAULT_ACCESS_TOKEN_KEY: &str = "access_token";

/// Default persistent-store key for the refresh token
pub const DEFAULT_REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Access token + refresh token, as minted by login or refresh
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Bearer credential for authenticated requests
    pub access_token: String,
    /// Credential used solely to mint a new access token
    pub refresh_token: String,
}

impl TokenPair {
    /// Create a new token pair
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens never show up in logs in full
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &redact_token(&self.access_token))
            .field("refresh_token", &redact_token(&self.refresh_token))
            .finish()
    }
}

/// Which of the two session secrets an operation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// The access token
    Access,
    /// The refresh token
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access token"),
            Self::Refresh => write!(f, "refresh token"),
        }
    }
}

/// Keys under which the two tokens live in the secure store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Key for the access token
    pub access_token: String,
    /// Key for the refresh token
    pub refresh_token: String,
}

impl StorageKeys {
    /// Create custom storage keys (e.g. to namespace per app)
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Key for the given token kind
    #[must_use]
    pub fn key(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.access_token,
            TokenKind::Refresh => &self.refresh_token,
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::new(DEFAULT_ACCESS_TOKEN_KEY, DEFAULT_REFRESH_TOKEN_KEY)
    }
}
