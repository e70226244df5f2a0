//! # bearer-guard
//!
//! Authenticated HTTP client with cached bearer tokens and automatic refresh.
//! Async/await, strong typing, tokio-based.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bearer_guard::{AuthClient, AuthClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = AuthClientOptions::builder()
//!         .base_url("https://api.example.com")
//!         .refresh_path("/auth/refresh")
//!         .build();
//!     let client = AuthClient::new(options)?;
//!
//!     // Tokens from your login flow
//!     client.set_tokens("access", "refresh").await?;
//!
//!     // Expired access tokens are refreshed and the request retried once
//!     let response = client.get("/users/me").await?;
//!     println!("{}", response.text());
//!     Ok(())
//! }
//! ```
//!
//! ## Core Features
//!
//! ### 1. Cached tokens
//!
//! Tokens live in memory after a single lazy read from a
//! [`SecureTokenStore`](auth::SecureTokenStore). Concurrent first requests
//! share that one read. Every mutation is written through to the store.
//!
//! ### 2. Refresh and retry
//!
//! A 401 triggers exactly one refresh, either against an endpoint
//! (`POST {"refresh_token": "..."}`) or through a custom
//! [`RefreshCallback`](callbacks::RefreshCallback), and exactly one retry.
//! If the refresh fails the session is cleared and the original 401 is
//! returned:
//!
//! ```no_run
//! # use bearer_guard::AuthClient;
//! # async fn example(client: AuthClient) {
//! match client.get("/users/me").await {
//!     Ok(response) => println!("{}", response.text()),
//!     Err(e) if e.is_unauthorized() => println!("Logged out, show login"),
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! # }
//! ```
//!
//! ### 3. Session events
//!
//! [`AuthClient::subscribe`] delivers [`SessionEvent`]s when tokens are set,
//! refreshed, or cleared.
//!
//! ## Modules
//!
//! - [`client`]: `AuthClient` and its builder
//! - [`interceptor`]: token injection and 401 recovery
//! - [`auth`]: session cache, token stores, refresh strategies
//! - [`transport`]: transport trait and the reqwest implementation
//! - [`callbacks`]: custom refresh callbacks
//! - [`types`]: requests, responses, tokens, options
//! - [`error`]: Error types and handling
//!
//! ## Feature Flags
//!
//! - `keyring` - Enables `KeyringTokenStore` backed by the OS keychain
//!
//! ## Logging
//!
//! This crate uses [`tracing`](https://crates.io/crates/tracing) for structured logging.
//! Tracing events are always emitted but are zero-cost when no subscriber is attached.
//! Tokens only ever appear as redacted previews.
//! To see logs, attach a tracing subscriber in your application:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! ## Demo
//!
//! `demos/session-cli` logs in, inspects and uses a session from the command
//! line:
//!
//! ```bash
//! cargo run -p session-cli -- --base-url https://api.example.com status
//! ```
//!
//! ## Security
//!
//! - **Redaction** - `Debug` output and logs never contain full tokens
//! - **File permissions** - `FileTokenStore` writes with user-only permissions (600)
//! - **No refresh recursion** - refresh calls use a transport without the interceptor
//! - **Bounded waits** - refresh and retry are subject to the request timeout

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod callbacks;
pub mod client;
pub mod error;
pub mod events;
pub mod interceptor;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use auth::{
    FileTokenStore, MemoryTokenStore, RefreshError, RefreshStrategy, SecureTokenStore,
    SessionCache, SharedTokenStore, StorageError,
};
pub use callbacks::{FnRefreshCallback, RefreshCallback, SharedRefreshCallback, refresh_fn};
pub use client::{AuthClient, AuthClientBuilder};
pub use error::{ClientError, Result};
pub use events::{ClearReason, SessionEvent};
pub use interceptor::AuthInterceptor;
pub use transport::{
    HttpTransport, SharedTransport, Transport, TransportError, TransportErrorKind,
};
pub use types::{
    AuthClientOptions, AuthClientOptionsBuilder, HttpRequest, HttpResponse, StorageKeys,
    TokenKind, TokenPair,
};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
