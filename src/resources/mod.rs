//! MCP resources served by the gateway.
//!
//! There is a single resource, the Help Center knowledge base, rendered as
//! one JSON document from [`KnowledgeBaseCache`].

mod knowledge_base;

use rmcp::model::{AnnotateAble, RawResource, ReadResourceResult, Resource, ResourceContents};
use serde::Serialize;

pub use knowledge_base::{DEFAULT_CACHE_TTL_SECONDS, KnowledgeBaseCache};

use crate::auth::AuthError;
use crate::zendesk::models::total_articles;
use crate::zendesk::{KnowledgeBase, ZendeskError};

/// URI of the knowledge-base resource.
pub const KNOWLEDGE_BASE_URI: &str = "zendesk://knowledge-base";

const KNOWLEDGE_BASE_NAME: &str = "Zendesk Knowledge Base";
const JSON_MIME_TYPE: &str = "application/json";

/// Error types for resource operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// Resource URI not found.
    NotFound(String),
    /// No usable credential for the read.
    Auth(AuthError),
    /// Fetching the underlying data failed.
    Upstream(ZendeskError),
    /// The document could not be rendered.
    Serialization(String),
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceError::NotFound(uri) => write!(f, "Resource not found: {}", uri),
            ResourceError::Auth(e) => write!(f, "{}", e),
            ResourceError::Upstream(e) => write!(f, "{}", e),
            ResourceError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ResourceError {}

impl From<AuthError> for ResourceError {
    fn from(e: AuthError) -> Self {
        ResourceError::Auth(e)
    }
}

impl From<ZendeskError> for ResourceError {
    fn from(e: ZendeskError) -> Self {
        ResourceError::Upstream(e)
    }
}

/// Resources advertised in `resources/list`.
pub fn list_resources() -> Vec<Resource> {
    vec![
        RawResource {
            uri: KNOWLEDGE_BASE_URI.to_string(),
            name: KNOWLEDGE_BASE_NAME.to_string(),
            title: None,
            description: Some(
                "Complete Help Center knowledge base: every section with its articles".to_string(),
            ),
            mime_type: Some(JSON_MIME_TYPE.to_string()),
            size: None,
            icons: None,
            meta: None,
        }
        .no_annotation(),
    ]
}

/// Read a resource by URI.
pub async fn read_resource(
    cache: &KnowledgeBaseCache,
    uri: &str,
) -> Result<ReadResourceResult, ResourceError> {
    if uri != KNOWLEDGE_BASE_URI {
        return Err(ResourceError::NotFound(uri.to_string()));
    }

    let kb = cache.get().await?;
    let text = render_knowledge_base(&kb)?;

    let mut contents = ResourceContents::text(text, uri);
    if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
        *mime_type = Some(JSON_MIME_TYPE.to_string());
    }

    Ok(ReadResourceResult {
        contents: vec![contents],
    })
}

#[derive(Serialize)]
struct KnowledgeBaseDocument<'a> {
    knowledge_base: &'a KnowledgeBase,
    metadata: KnowledgeBaseMetadata,
}

#[derive(Serialize)]
struct KnowledgeBaseMetadata {
    sections: usize,
    total_articles: usize,
}

/// Pretty-printed `{knowledge_base, metadata}` document.
///
/// Sections, and the fields inside each section and article, keep their
/// declared order.
pub fn render_knowledge_base(kb: &KnowledgeBase) -> Result<String, ResourceError> {
    let document = KnowledgeBaseDocument {
        knowledge_base: kb,
        metadata: KnowledgeBaseMetadata {
            sections: kb.len(),
            total_articles: total_articles(kb),
        },
    };
    serde_json::to_string_pretty(&document).map_err(|e| ResourceError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{self, AuthContext};
    use crate::types::{BearerToken, Tenant};
    use crate::zendesk::mock::RecordingFactory;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    fn ctx() -> AuthContext {
        AuthContext::new(BearerToken::new("tok"), Tenant::new("acme")).unwrap()
    }

    #[test]
    fn test_list_resources() {
        let resources = list_resources();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].uri, KNOWLEDGE_BASE_URI);
        assert_eq!(resources[0].name, "Zendesk Knowledge Base");
        assert_eq!(resources[0].mime_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_read_knowledge_base_document() {
        let factory = RecordingFactory::default();
        let cache = KnowledgeBaseCache::new(Arc::new(factory), Duration::from_secs(60));

        let result = auth::scope(ctx(), read_resource(&cache, KNOWLEDGE_BASE_URI))
            .await
            .unwrap();
        assert_eq!(result.contents.len(), 1);

        let text = match &result.contents[0] {
            ResourceContents::TextResourceContents {
                text, uri, mime_type, ..
            } => {
                assert_eq!(uri, KNOWLEDGE_BASE_URI);
                assert_eq!(mime_type.as_deref(), Some("application/json"));
                text.clone()
            }
            other => panic!("unexpected contents: {other:?}"),
        };
        assert!(text.contains('\n'), "document should be pretty-printed");

        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["metadata"]["sections"], 2);
        assert_eq!(doc["metadata"]["total_articles"], 3);
        let faq = &doc["knowledge_base"]["acme FAQ"];
        assert_eq!(faq["section_id"], 1);
        assert_eq!(faq["articles"][0]["title"], "Reset password");
        assert_eq!(faq["articles"][0]["url"], "https://hc/10");
        assert_eq!(doc["knowledge_base"]["Billing"]["description"], Value::Null);

        // Upstream section order, not alphabetical; fields in declared order.
        let position = |needle: &str| text.find(needle).unwrap();
        assert!(position("\"acme FAQ\"") < position("\"Billing\""));
        assert!(position("\"section_id\"") < position("\"description\""));
        assert!(position("\"description\"") < position("\"articles\""));
        assert!(position("\"knowledge_base\"") < position("\"metadata\""));
    }

    #[tokio::test]
    async fn test_read_unknown_uri() {
        let factory = RecordingFactory::default();
        let cache = KnowledgeBaseCache::new(Arc::new(factory.clone()), Duration::from_secs(60));

        let err = auth::scope(ctx(), read_resource(&cache, "zendesk://other"))
            .await
            .unwrap_err();
        assert_eq!(err, ResourceError::NotFound("zendesk://other".to_string()));
        assert_eq!(factory.kb_fetches(), 0);
    }

    #[test]
    fn test_render_empty_knowledge_base() {
        let text = render_knowledge_base(&KnowledgeBase::new()).unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["knowledge_base"], serde_json::json!({}));
        assert_eq!(doc["metadata"]["total_articles"], 0);
    }
}
