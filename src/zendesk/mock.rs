//! In-memory ticketing backend for unit tests.
//!
//! Responses embed the credential that built the client, so tests can tell
//! which caller an upstream call was made for.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use crate::auth::{AuthContext, AuthError};
use crate::types::{SectionName, Tenant};
use crate::zendesk::models::{
    Article, Comment, KnowledgeBase, KnowledgeBaseSection, Ticket, TicketSummary, User,
};
use crate::zendesk::{
    ApiFuture, ClientFactory, TicketingApi, ZendeskError, normalize_search_query,
};

#[derive(Default)]
struct MockState {
    contexts: Vec<AuthContext>,
    calls: Vec<String>,
    kb_fetches: usize,
    failure: Option<String>,
    kb_holds: HashMap<Tenant, Arc<Notify>>,
}

/// Factory recording every context it is asked to build a client for.
#[derive(Clone, Default)]
pub struct RecordingFactory {
    state: Arc<Mutex<MockState>>,
}

impl RecordingFactory {
    pub fn contexts(&self) -> Vec<AuthContext> {
        self.state.lock().unwrap().contexts.clone()
    }

    /// Upstream calls in order, as `operation:argument` strings.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn kb_fetches(&self) -> usize {
        self.state.lock().unwrap().kb_fetches
    }

    /// Make every subsequent upstream call fail with `cause`.
    pub fn fail_with(&self, cause: &str) {
        self.state.lock().unwrap().failure = Some(cause.to_string());
    }

    pub fn recover(&self) {
        self.state.lock().unwrap().failure = None;
    }

    /// Park knowledge-base fetches for `tenant` until the returned handle is
    /// notified.
    pub fn hold_knowledge_base(&self, tenant: &Tenant) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.state
            .lock()
            .unwrap()
            .kb_holds
            .insert(tenant.clone(), notify.clone());
        notify
    }
}

impl ClientFactory for RecordingFactory {
    fn create(&self, ctx: &AuthContext) -> Result<Arc<dyn TicketingApi>, AuthError> {
        self.state.lock().unwrap().contexts.push(ctx.clone());
        Ok(Arc::new(MockTicketingApi {
            ctx: ctx.clone(),
            state: self.state.clone(),
        }))
    }
}

pub struct MockTicketingApi {
    ctx: AuthContext,
    state: Arc<Mutex<MockState>>,
}

impl MockTicketingApi {
    fn record(&self, call: String) -> Option<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.failure.clone()
    }

    fn token(&self) -> &str {
        self.ctx.credential().expose()
    }

    fn summary(&self, id: u64) -> TicketSummary {
        TicketSummary {
            id,
            subject: Some(format!("ticket {} for {}", id, self.token())),
            status: Some("open".to_string()),
            priority: None,
            created_at: None,
            updated_at: None,
            requester_id: None,
            assignee_id: None,
        }
    }
}

impl TicketingApi for MockTicketingApi {
    fn get_ticket(&self, ticket_id: u64) -> ApiFuture<'_, Ticket> {
        Box::pin(async move {
            if let Some(cause) = self.record(format!("get_ticket:{}", ticket_id)) {
                return Err(ZendeskError::upstream("get ticket", Some(ticket_id.to_string()), cause));
            }
            // Yield so concurrent callers interleave.
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(Ticket {
                id: ticket_id,
                subject: Some(format!("ticket {} for {}", ticket_id, self.token())),
                description: Some("description".to_string()),
                status: Some("open".to_string()),
                priority: Some("high".to_string()),
                created_at: Some("2024-01-01T00:00:00Z".to_string()),
                updated_at: None,
                requester_id: Some(1),
                assignee_id: None,
                organization_id: None,
            })
        })
    }

    fn get_ticket_comments(&self, ticket_id: u64) -> ApiFuture<'_, Vec<Comment>> {
        Box::pin(async move {
            if let Some(cause) = self.record(format!("get_ticket_comments:{}", ticket_id)) {
                return Err(ZendeskError::upstream(
                    "get comments for ticket",
                    Some(ticket_id.to_string()),
                    cause,
                ));
            }
            Ok(vec![Comment {
                id: 1,
                author_id: Some(2),
                body: Some("hello".to_string()),
                html_body: Some("<p>hello</p>".to_string()),
                public: Some(true),
                created_at: None,
            }])
        })
    }

    fn post_comment(
        &self,
        ticket_id: u64,
        comment: String,
        public: bool,
    ) -> ApiFuture<'_, String> {
        Box::pin(async move {
            if let Some(cause) =
                self.record(format!("post_comment:{}:{}:{}", ticket_id, public, comment))
            {
                return Err(ZendeskError::upstream(
                    "post comment on ticket",
                    Some(ticket_id.to_string()),
                    cause,
                ));
            }
            Ok(comment)
        })
    }

    fn get_recent_tickets(&self, limit: usize) -> ApiFuture<'_, Vec<TicketSummary>> {
        Box::pin(async move {
            if let Some(cause) = self.record(format!("get_recent_tickets:{}", limit)) {
                return Err(ZendeskError::upstream("get recent tickets", None, cause));
            }
            Ok((0..limit.min(3) as u64).rev().map(|id| self.summary(id)).collect())
        })
    }

    fn search_tickets(&self, query: String, limit: usize) -> ApiFuture<'_, Vec<TicketSummary>> {
        Box::pin(async move {
            let upstream_query = normalize_search_query(&query);
            if let Some(cause) = self.record(format!("search_tickets:{}:{}", upstream_query, limit)) {
                return Err(ZendeskError::upstream("search tickets", None, cause));
            }
            Ok(vec![self.summary(99)].into_iter().take(limit).collect())
        })
    }

    fn get_user(&self, user_id: u64) -> ApiFuture<'_, User> {
        Box::pin(async move {
            if let Some(cause) = self.record(format!("get_user:{}", user_id)) {
                return Err(ZendeskError::upstream("get user", Some(user_id.to_string()), cause));
            }
            Ok(User {
                id: user_id,
                name: Some(format!("user for {}", self.token())),
                email: Some("user@example.com".to_string()),
                role: Some("agent".to_string()),
                created_at: None,
                updated_at: None,
                organization_id: None,
                phone: None,
                time_zone: Some("UTC".to_string()),
            })
        })
    }

    fn get_all_articles(&self) -> ApiFuture<'_, KnowledgeBase> {
        Box::pin(async move {
            let (fetch_number, hold) = {
                let mut state = self.state.lock().unwrap();
                state.calls.push("get_all_articles".to_string());
                if let Some(cause) = state.failure.clone() {
                    return Err(ZendeskError::upstream("fetch knowledge base", None, cause));
                }
                state.kb_fetches += 1;
                (state.kb_fetches, state.kb_holds.get(self.ctx.tenant()).cloned())
            };
            if let Some(hold) = hold {
                hold.notified().await;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;

            let mut kb = KnowledgeBase::new();
            kb.insert(
                SectionName::new(format!("{} FAQ", self.ctx.tenant())),
                KnowledgeBaseSection {
                    section_id: 1,
                    description: Some(format!("fetch #{} by {}", fetch_number, self.token())),
                    articles: vec![
                        Article {
                            id: 10,
                            title: Some("Reset password".to_string()),
                            body: Some("<p>steps</p>".to_string()),
                            updated_at: None,
                            url: Some("https://hc/10".to_string()),
                        },
                        Article {
                            id: 11,
                            title: Some("Change email".to_string()),
                            body: None,
                            updated_at: None,
                            url: None,
                        },
                    ],
                },
            );
            kb.insert(
                SectionName::new("Billing"),
                KnowledgeBaseSection {
                    section_id: 2,
                    description: None,
                    articles: vec![Article {
                        id: 20,
                        title: Some("Invoices".to_string()),
                        body: None,
                        updated_at: None,
                        url: None,
                    }],
                },
            );
            Ok(kb)
        })
    }
}
