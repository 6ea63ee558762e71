//! reqwest-backed Zendesk client.

use http::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::types::{BearerToken, SectionName};
use crate::zendesk::models::{
    Article, Comment, KnowledgeBase, KnowledgeBaseSection, Section, Ticket, TicketSummary, User,
};
use crate::zendesk::{ApiFuture, TicketingApi, ZendeskError, normalize_search_query};

/// Upper bound on pages followed for a single listing.
const MAX_PAGES: usize = 100;

/// Largest page size Zendesk accepts.
const MAX_PER_PAGE: usize = 100;

/// Longest upstream error body echoed into an error message.
const MAX_ERROR_BODY: usize = 200;

/// Zendesk client bound to one caller's credential.
///
/// Cheap to construct: the HTTP connection pool is shared through the
/// `reqwest::Client` handle.
pub struct ZendeskClient {
    http: reqwest::Client,
    base_url: Url,
    token: BearerToken,
}

impl ZendeskClient {
    /// `base_url` is the instance root, e.g. `https://acme.zendesk.com/`.
    pub fn new(http: reqwest::Client, base_url: Url, token: BearerToken) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, String> {
        self.base_url
            .join(path)
            .map_err(|e| format!("invalid endpoint '{}': {}", path, e))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, String> {
        let response = request
            .bearer_auth(self.token.expose())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(format!("HTTP {}: {}", status, body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| format!("invalid response body: {}", e))
    }

    async fn get_json(&self, url: Url) -> Result<Value, String> {
        debug!(url = %url.path(), "GET");
        self.send(self.http.get(url)).await
    }

    /// Take `key` out of a response object and deserialize it.
    fn extract<T: DeserializeOwned>(mut payload: Value, key: &str) -> Result<T, String> {
        let inner = payload
            .get_mut(key)
            .map(Value::take)
            .ok_or_else(|| format!("response has no '{}' field", key))?;
        serde_json::from_value(inner).map_err(|e| format!("unexpected '{}' payload: {}", key, e))
    }

    /// Resolve a `next_page` link, refusing hosts other than our own.
    fn next_page_url(&self, link: &str) -> Option<Url> {
        let url = match Url::parse(link) {
            Ok(url) => url,
            Err(e) => {
                warn!("Ignoring unparseable next_page link: {}", e);
                return None;
            }
        };
        if url.origin() != self.base_url.origin() {
            warn!(
                host = ?url.host_str(),
                "Not following next_page to a foreign host"
            );
            return None;
        }
        Some(url)
    }

    /// Follow Zendesk offset pagination, collecting the array under `key`.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        url: Url,
        key: &str,
        limit: Option<usize>,
    ) -> Result<Vec<T>, String> {
        let mut items = Vec::new();
        let mut next = Some(url);
        let mut pages = 0;

        while let Some(url) = next.take() {
            if pages == MAX_PAGES {
                warn!(key, "Stopped after {} pages", MAX_PAGES);
                break;
            }
            pages += 1;

            let page = self.get_json(url).await?;
            let next_link = page
                .get("next_page")
                .and_then(Value::as_str)
                .map(str::to_string);
            let batch: Vec<T> = Self::extract(page, key)?;
            items.extend(batch);

            if let Some(limit) = limit
                && items.len() >= limit
            {
                items.truncate(limit);
                break;
            }

            next = next_link.and_then(|link| self.next_page_url(&link));
        }

        Ok(items)
    }

    async fn fetch_ticket(&self, ticket_id: u64) -> Result<Ticket, String> {
        let url = self.endpoint(&format!("api/v2/tickets/{}.json", ticket_id))?;
        let payload = self.get_json(url).await?;
        Self::extract(payload, "ticket")
    }

    async fn fetch_comments(&self, ticket_id: u64) -> Result<Vec<Comment>, String> {
        let url = self.endpoint(&format!("api/v2/tickets/{}/comments.json", ticket_id))?;
        self.get_paged(url, "comments", None).await
    }

    async fn put_comment(&self, ticket_id: u64, comment: &str, public: bool) -> Result<(), String> {
        let url = self.endpoint(&format!("api/v2/tickets/{}.json", ticket_id))?;
        let body = json!({
            "ticket": {
                "comment": {
                    "html_body": comment,
                    "public": public,
                }
            }
        });
        self.send(self.http.put(url).json(&body)).await?;
        Ok(())
    }

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<TicketSummary>, String> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut url = self.endpoint("api/v2/tickets.json")?;
        url.query_pairs_mut()
            .append_pair("sort_by", "created_at")
            .append_pair("sort_order", "desc")
            .append_pair("per_page", &limit.min(MAX_PER_PAGE).to_string());
        self.get_paged(url, "tickets", Some(limit)).await
    }

    async fn fetch_search(&self, query: &str, limit: usize) -> Result<Vec<TicketSummary>, String> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut url = self.endpoint("api/v2/search.json")?;
        url.query_pairs_mut()
            .append_pair("query", &normalize_search_query(query))
            .append_pair("per_page", &limit.min(MAX_PER_PAGE).to_string());

        let results: Vec<Value> = self.get_paged(url, "results", Some(limit)).await?;
        results
            .into_iter()
            .filter(|r| {
                r.get("result_type")
                    .and_then(Value::as_str)
                    .is_none_or(|t| t == "ticket")
            })
            .map(|r| {
                serde_json::from_value::<TicketSummary>(r)
                    .map_err(|e| format!("unexpected search result: {}", e))
            })
            .collect()
    }

    async fn fetch_user(&self, user_id: u64) -> Result<User, String> {
        let url = self.endpoint(&format!("api/v2/users/{}.json", user_id))?;
        let payload = self.get_json(url).await?;
        Self::extract(payload, "user")
    }

    async fn fetch_knowledge_base(&self) -> Result<KnowledgeBase, String> {
        let url = self.endpoint("api/v2/help_center/sections.json")?;
        let sections: Vec<Section> = self.get_paged(url, "sections", None).await?;

        let mut kb = KnowledgeBase::new();
        for section in sections {
            let url = self.endpoint(&format!(
                "api/v2/help_center/sections/{}/articles.json",
                section.id
            ))?;
            let articles: Vec<Article> = self.get_paged(url, "articles", None).await?;
            kb.insert(
                SectionName::new(section.name),
                KnowledgeBaseSection {
                    section_id: section.id,
                    description: section.description,
                    articles,
                },
            );
        }

        debug!(sections = kb.len(), "Fetched knowledge base");
        Ok(kb)
    }
}

impl TicketingApi for ZendeskClient {
    fn get_ticket(&self, ticket_id: u64) -> ApiFuture<'_, Ticket> {
        Box::pin(async move {
            self.fetch_ticket(ticket_id)
                .await
                .map_err(|e| ZendeskError::upstream("get ticket", Some(ticket_id.to_string()), e))
        })
    }

    fn get_ticket_comments(&self, ticket_id: u64) -> ApiFuture<'_, Vec<Comment>> {
        Box::pin(async move {
            self.fetch_comments(ticket_id).await.map_err(|e| {
                ZendeskError::upstream(
                    "get comments for ticket",
                    Some(ticket_id.to_string()),
                    e,
                )
            })
        })
    }

    fn post_comment(
        &self,
        ticket_id: u64,
        comment: String,
        public: bool,
    ) -> ApiFuture<'_, String> {
        Box::pin(async move {
            self.put_comment(ticket_id, &comment, public)
                .await
                .map_err(|e| {
                    ZendeskError::upstream(
                        "post comment on ticket",
                        Some(ticket_id.to_string()),
                        e,
                    )
                })?;
            Ok(comment)
        })
    }

    fn get_recent_tickets(&self, limit: usize) -> ApiFuture<'_, Vec<TicketSummary>> {
        Box::pin(async move {
            self.fetch_recent(limit)
                .await
                .map_err(|e| ZendeskError::upstream("get recent tickets", None, e))
        })
    }

    fn search_tickets(&self, query: String, limit: usize) -> ApiFuture<'_, Vec<TicketSummary>> {
        Box::pin(async move {
            self.fetch_search(&query, limit)
                .await
                .map_err(|e| ZendeskError::upstream("search tickets", None, e))
        })
    }

    fn get_user(&self, user_id: u64) -> ApiFuture<'_, User> {
        Box::pin(async move {
            self.fetch_user(user_id)
                .await
                .map_err(|e| ZendeskError::upstream("get user", Some(user_id.to_string()), e))
        })
    }

    fn get_all_articles(&self) -> ApiFuture<'_, KnowledgeBase> {
        Box::pin(async move {
            self.fetch_knowledge_base()
                .await
                .map_err(|e| ZendeskError::upstream("fetch knowledge base", None, e))
        })
    }
}
