//! Tool handlers exposed over MCP.
//!
//! Tools are registered in a [`ToolRegistry`]. Ticket tools are written
//! against a [`TicketingApi`](crate::zendesk::TicketingApi) client that
//! [`with_zendesk_client`] injects per call, so none of them handles
//! credentials directly.

mod inject;
mod registry;
mod tickets;

use std::fmt;

pub use inject::{BoundArgs, ParamKind, ParamSpec, with_zendesk_client};
pub use registry::{ToolFuture, ToolHandler, ToolRegistry};
pub use tickets::register_tools;

use crate::auth::AuthError;
use crate::zendesk::ZendeskError;

/// Errors from registering or executing tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// A handler's declared parameters cannot be exposed as a tool.
    InvalidHandlerShape(String),
    /// Call arguments do not match the tool's parameters.
    InvalidArguments(String),
    /// No tool with this name is registered.
    UnknownTool(String),
    /// No usable credential for the call.
    Auth(AuthError),
    /// The ticketing backend call failed.
    Upstream(ZendeskError),
    /// The result could not be serialized.
    Serialization(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHandlerShape(msg) => write!(f, "Invalid handler shape: {}", msg),
            Self::InvalidArguments(msg) => write!(f, "Invalid arguments: {}", msg),
            Self::UnknownTool(name) => write!(f, "Tool not found: {}", name),
            Self::Auth(e) => write!(f, "{}", e),
            Self::Upstream(e) => write!(f, "{}", e),
            Self::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ToolError {}

impl From<AuthError> for ToolError {
    fn from(e: AuthError) -> Self {
        Self::Auth(e)
    }
}

impl From<ZendeskError> for ToolError {
    fn from(e: ZendeskError) -> Self {
        Self::Upstream(e)
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_display() {
        assert_eq!(
            ToolError::UnknownTool("nope".to_string()).to_string(),
            "Tool not found: nope"
        );
        assert_eq!(
            ToolError::from(AuthError::ContextMissing).to_string(),
            "Zendesk auth context missing"
        );
        let upstream = ZendeskError::upstream("get user", Some("5".to_string()), "HTTP 500");
        assert_eq!(
            ToolError::from(upstream).to_string(),
            "Failed to get user 5: HTTP 500"
        );
    }
}
