//! Session state, token storage and refresh
//!
//! Provides the pieces the interceptor is built from.
//!
//! # Overview
//!
//! - [`SecureTokenStore`] is the persistent key-value contract for the two
//!   secrets, with in-memory, file and (feature `keyring`) OS keychain
//!   implementations.
//! - [`SessionCache`] keeps the tokens in memory, hydrates them from the
//!   store at most once, and writes every mutation through to the store.
//! - [`RefreshStrategy`] decides how an expired session gets a new pair.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bearer_guard::auth::{FileTokenStore, SessionCache};
//! use bearer_guard::types::{StorageKeys, TokenPair};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = SessionCache::new(Arc::new(FileTokenStore::new()), StorageKeys::default());
//!
//!     session.set_tokens(TokenPair::new("access", "refresh")).await?;
//!     assert_eq!(session.access_token().as_deref(), Some("access"));
//!     Ok(())
//! }
//! ```
//!
//! # Security
//!
//! - Token files are written with user-only permissions (600)
//! - Tokens are redacted in every `Debug` impl and log line

mod refresh;
mod session;
mod store;

pub use refresh::{RefreshError, RefreshStrategy, parse_refresh_response};
pub use session::{SessionCache, SessionState};
#[cfg(feature = "keyring")]
pub use store::KeyringTokenStore;
pub use store::{
    FileTokenStore, MemoryTokenStore, SecureTokenStore, SharedTokenStore, StorageError,
};
