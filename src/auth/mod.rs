//! Authentication and per-request credential propagation.
//!
//! Every inbound MCP request carries the caller's own Zendesk OAuth token.
//! The server process is shared, so the credential has to travel with the
//! request rather than live in the server:
//!
//! - [`middleware`] validates the `Authorization` header at the HTTP layer,
//!   builds an [`AuthContext`] and stores it in the request extensions.
//! - The request then runs inside [`context::scope`], a task-local slot.
//! - Tool handlers obtain a client through the client factory, which reads
//!   [`context::current`]. Handlers never see raw credentials.
//!
//! ## Security Model
//!
//! - The tenant always comes from process configuration, never the request
//! - Context is task-scoped, never process or thread global
//! - Raw tokens are never logged, only their fingerprints
//! - Every ambiguous condition rejects the request

pub mod context;
pub mod middleware;


use std::fmt;

pub use context::{AuthContext, current, scope, try_current};
pub use middleware::{
    BEARER_PREFIX, HEALTH_PATH, Rejection, TokenAuthConfig, UNAUTHENTICATED_METHODS,
    user_token_middleware,
};

/// Authentication errors raised after the HTTP boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// An operation needed a credential but no auth context is active.
    ContextMissing,
    /// The credential or tenant cannot form a usable context.
    InvalidContext(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextMissing => write!(f, "Zendesk auth context missing"),
            Self::InvalidContext(msg) => write!(f, "Invalid auth context: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}
