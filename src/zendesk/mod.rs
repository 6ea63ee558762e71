//! Zendesk REST API access.
//!
//! [`TicketingApi`] is the surface the tools need and nothing more. The
//! production implementation is [`ZendeskClient`]; instances are created per
//! request by a [`ClientFactory`] from the active auth context.

mod client;
pub mod factory;
pub mod models;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

pub use client::ZendeskClient;
pub use factory::{ClientFactory, DEFAULT_API_BASE_URL, ZendeskClientFactory, build};
pub use models::{
    Article, Comment, KnowledgeBase, KnowledgeBaseSection, Section, Ticket, TicketSummary, User,
};

/// Search filter that restricts Zendesk search to tickets.
pub const TICKET_TYPE_FILTER: &str = "type:ticket";

/// Boxed future returned by [`TicketingApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ZendeskError>> + Send + 'a>>;

/// Operations the gateway performs against the ticketing backend.
pub trait TicketingApi: Send + Sync {
    fn get_ticket(&self, ticket_id: u64) -> ApiFuture<'_, Ticket>;

    /// All comments on a ticket, oldest first.
    fn get_ticket_comments(&self, ticket_id: u64) -> ApiFuture<'_, Vec<Comment>>;

    /// Add a comment to a ticket; returns the comment text that was posted.
    fn post_comment(&self, ticket_id: u64, comment: String, public: bool)
    -> ApiFuture<'_, String>;

    /// Most recently created tickets, newest first.
    fn get_recent_tickets(&self, limit: usize) -> ApiFuture<'_, Vec<TicketSummary>>;

    /// Zendesk search, restricted to tickets.
    fn search_tickets(&self, query: String, limit: usize) -> ApiFuture<'_, Vec<TicketSummary>>;

    fn get_user(&self, user_id: u64) -> ApiFuture<'_, User>;

    /// Every Help Center section with all of its articles.
    fn get_all_articles(&self) -> ApiFuture<'_, KnowledgeBase>;
}

/// Prefix `query` with the ticket type filter unless it already has one.
pub fn normalize_search_query(query: &str) -> String {
    if query.contains(TICKET_TYPE_FILTER) {
        query.to_string()
    } else {
        format!("{} {}", TICKET_TYPE_FILTER, query)
    }
}

/// Errors from upstream Zendesk calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZendeskError {
    /// A backend call failed, for whatever reason.
    Upstream {
        /// What was being attempted, e.g. "get ticket".
        operation: String,
        /// Identifier the operation targeted, if any.
        id: Option<String>,
        /// Underlying cause.
        cause: String,
    },
}

impl ZendeskError {
    pub fn upstream(
        operation: impl Into<String>,
        id: Option<String>,
        cause: impl fmt::Display,
    ) -> Self {
        Self::Upstream {
            operation: operation.into(),
            id,
            cause: cause.to_string(),
        }
    }
}

impl fmt::Display for ZendeskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upstream {
                operation,
                id: Some(id),
                cause,
            } => write!(f, "Failed to {} {}: {}", operation, id, cause),
            Self::Upstream {
                operation,
                id: None,
                cause,
            } => write!(f, "Failed to {}: {}", operation, cause),
        }
    }
}

impl std::error::Error for ZendeskError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_search_query_adds_prefix() {
        assert_eq!(
            normalize_search_query("status:open"),
            "type:ticket status:open"
        );
        assert_eq!(normalize_search_query(""), "type:ticket ");
    }

    #[test]
    fn test_normalize_search_query_keeps_existing_filter() {
        assert_eq!(
            normalize_search_query("type:ticket urgent"),
            "type:ticket urgent"
        );
        assert_eq!(
            normalize_search_query("urgent type:ticket"),
            "urgent type:ticket"
        );
    }

    #[test]
    fn test_zendesk_error_display() {
        let err = ZendeskError::upstream("get ticket", Some("42".to_string()), "HTTP 404");
        assert_eq!(err.to_string(), "Failed to get ticket 42: HTTP 404");

        let err = ZendeskError::upstream("search tickets", None, "timeout");
        assert_eq!(err.to_string(), "Failed to search tickets: timeout");
    }
}
