//! Type definitions for bearer-guard
//!
//! Request and response descriptors exchanged with transports, the token
//! pair and its storage keys, and client options.

// Module declarations
pub mod options;
pub mod request;
pub mod response;
pub mod tokens;

pub use options::{AuthClientOptions, AuthClientOptionsBuilder, DEFAULT_TIMEOUT};
pub use request::HttpRequest;
pub use response::HttpResponse;
pub use tokens::{
    DEFAULT_ACCESS_TOKEN_KEY, DEFAULT_REFRESH_TOKEN_KEY, StorageKeys, TokenKind, TokenPair,
};
