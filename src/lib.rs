// Core modules
mod config;
mod types;
pub mod auth;
pub mod zendesk;

// MCP surface
pub mod api;
mod prompts;
mod resources;
pub mod server;
mod tools;

// Re-export key types and functions
pub use auth::{AuthContext, AuthError, TokenAuthConfig};
pub use config::ServerConfig;
pub use resources::KnowledgeBaseCache;
pub use server::ZendeskMcpServer;
pub use tools::{ToolError, ToolHandler, ToolRegistry};
pub use types::{BearerToken, SectionName, Tenant};
pub use zendesk::{ClientFactory, ZendeskClientFactory};

use std::sync::Arc;
use anyhow::Result;

/// Convenience function to create a fully configured MCP server.
///
/// Builds the production client factory, registers the ticket tools and
/// sets up the knowledge-base cache.
pub fn create_server(config: &ServerConfig) -> Result<ZendeskMcpServer> {
    let factory: Arc<dyn ClientFactory> = Arc::new(ZendeskClientFactory::new(
        config.api_base_url.clone(),
        config.request_timeout,
    )?);

    let tool_registry = tools::register_tools(ToolRegistry::new(), factory.clone())?;
    let knowledge_base = KnowledgeBaseCache::new(factory, config.kb_cache_ttl);

    Ok(ZendeskMcpServer::new(
        Arc::new(tool_registry),
        Arc::new(knowledge_base),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_server_registers_tools() {
        let config = ServerConfig::new(Some("acme".to_string()), None, 60, 10).unwrap();
        let server = create_server(&config).unwrap();
        assert_eq!(server.tool_registry().len(), 6);
        assert_eq!(server.knowledge_base().ttl(), std::time::Duration::from_secs(60));
    }
}
