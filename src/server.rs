//! MCP server implementation using rmcp.
//!
//! [`ZendeskMcpServer`] answers protocol requests. Each request that can
//! reach Zendesk runs inside the auth scope of the HTTP request that carried
//! it: rmcp may dispatch handlers on their own tasks, so the context is
//! taken from the HTTP request parts rmcp stores in the request extensions
//! and re-entered here.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use rmcp::{
    ErrorData as McpError,
    handler::server::ServerHandler,
    model::*,
    service::{RequestContext, RoleServer},
};
use tracing::{debug, info, warn};

use crate::api;
use crate::auth::{self, AuthContext, AuthError, TokenAuthConfig};
use crate::prompts::{self, PromptError};
use crate::resources::{self, KnowledgeBaseCache, ResourceError};
use crate::tools::{ToolError, ToolRegistry};

/// Type alias for HTTP request parts stored in rmcp extensions.
type HttpParts = http::request::Parts;

/// JSON-RPC error code for requests lacking a usable credential.
const AUTH_REQUIRED_CODE: ErrorCode = ErrorCode(-32001);

/// MCP server exposing Zendesk tools, prompts and the knowledge base.
#[derive(Clone)]
pub struct ZendeskMcpServer {
    tool_registry: Arc<ToolRegistry>,
    knowledge_base: Arc<KnowledgeBaseCache>,
    /// Context used when the request carries none (stdio mode).
    fallback_context: Option<AuthContext>,
}

impl ZendeskMcpServer {
    pub fn new(tool_registry: Arc<ToolRegistry>, knowledge_base: Arc<KnowledgeBaseCache>) -> Self {
        Self {
            tool_registry,
            knowledge_base,
            fallback_context: None,
        }
    }

    /// Use `ctx` for every request that arrives without its own context.
    pub fn with_fallback_context(mut self, ctx: AuthContext) -> Self {
        self.fallback_context = Some(ctx);
        self
    }

    pub fn tool_registry(&self) -> &Arc<ToolRegistry> {
        &self.tool_registry
    }

    pub fn knowledge_base(&self) -> &Arc<KnowledgeBaseCache> {
        &self.knowledge_base
    }

    fn request_auth(&self, context: &RequestContext<RoleServer>) -> Option<AuthContext> {
        resolve_auth_context(
            context.extensions.get::<HttpParts>(),
            self.fallback_context.as_ref(),
        )
    }
}

/// Pick the auth context for one protocol request.
///
/// In order: the context the middleware attached to the HTTP request, an
/// already active scope, then the fallback.
pub fn resolve_auth_context(
    parts: Option<&HttpParts>,
    fallback: Option<&AuthContext>,
) -> Option<AuthContext> {
    parts
        .and_then(|p| p.extensions.get::<AuthContext>().cloned())
        .or_else(auth::try_current)
        .or_else(|| fallback.cloned())
}

/// Await `fut` inside `ctx`'s scope, or bare when there is none.
pub async fn with_auth<F: Future>(ctx: Option<AuthContext>, fut: F) -> F::Output {
    match ctx {
        Some(ctx) => auth::scope(ctx, fut).await,
        None => fut.await,
    }
}

fn auth_error(e: &AuthError) -> McpError {
    McpError::new(
        AUTH_REQUIRED_CODE,
        "Authentication required".to_string(),
        Some(serde_json::json!({ "reason": e.to_string() })),
    )
}

/// Map a tool outcome onto the protocol.
///
/// Upstream failures are tool results flagged as errors so the calling
/// agent can read them; everything else is a protocol error.
pub fn tool_result(name: &str, result: Result<String, ToolError>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
        Err(ToolError::Upstream(e)) => {
            warn!(tool = %name, error = %e, "Tool call failed upstream");
            Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
        }
        Err(ToolError::Auth(e)) => {
            warn!(tool = %name, error = %e, "Tool call without credential");
            Err(auth_error(&e))
        }
        Err(e @ (ToolError::InvalidArguments(_) | ToolError::UnknownTool(_))) => {
            Err(McpError::invalid_params(e.to_string(), None))
        }
        Err(e @ (ToolError::InvalidHandlerShape(_) | ToolError::Serialization(_))) => {
            Err(McpError::internal_error(format!("Tool execution failed: {}", e), None))
        }
    }
}

fn resource_error(e: ResourceError) -> McpError {
    match e {
        ResourceError::NotFound(uri) => {
            // -32002: Resource not found
            McpError::new(ErrorCode(-32002), format!("Resource not found: {}", uri), None)
        }
        ResourceError::Auth(e) => auth_error(&e),
        e @ (ResourceError::Upstream(_) | ResourceError::Serialization(_)) => {
            McpError::internal_error(format!("Failed to read resource: {}", e), None)
        }
    }
}

impl ServerHandler for ZendeskMcpServer {
    fn ping(
        &self,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<(), McpError>> + Send + '_ {
        std::future::ready(Ok(()))
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let result = ListToolsResult {
            tools: self.tool_registry.list_tools(),
            next_cursor: None,
            ..Default::default()
        };
        std::future::ready(Ok(result))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        let tool_name = request.name.to_string();
        let args = request.arguments.unwrap_or_default();
        let registry = self.tool_registry.clone();
        let ctx = self.request_auth(&context);

        async move {
            debug!(tool = %tool_name, authenticated = ctx.is_some(), "Calling tool");
            let result = with_auth(ctx, registry.call_tool(&tool_name, args)).await;
            tool_result(&tool_name, result)
        }
    }

    fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListPromptsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(prompts::list_prompts()))
    }

    fn get_prompt(
        &self,
        request: GetPromptRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<GetPromptResult, McpError>> + Send + '_ {
        let result = prompts::get_prompt(&request.name, request.arguments).map_err(|e| match e {
            // -32602: Invalid params
            PromptError::NotFound(_) | PromptError::InvalidArguments(_) => {
                McpError::invalid_params(e.to_string(), None)
            }
        });
        std::future::ready(result)
    }

    fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListResourcesResult {
            meta: None,
            resources: resources::list_resources(),
            next_cursor: None,
        }))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        let cache = self.knowledge_base.clone();
        let uri = request.uri.to_string();
        let ctx = self.request_auth(&context);

        async move {
            with_auth(ctx, resources::read_resource(&cache, &uri))
                .await
                .map_err(resource_error)
        }
    }

    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Zendesk gateway: read and search tickets, read users, post ticket comments, \
                 and read the Help Center knowledge base. Every call acts with the caller's \
                 own Zendesk OAuth token."
                    .to_string(),
            ),
        }
    }
}

/// Serve the MCP Streamable HTTP endpoint at `/mcp` plus `/health` on
/// `bind`, e.g. `0.0.0.0:8000`.
pub async fn start_mcp_http(
    server: ZendeskMcpServer,
    bind: &str,
    auth_config: TokenAuthConfig,
) -> Result<()> {
    if auth_config.tenant.is_none() {
        warn!("No Zendesk subdomain configured; every credentialed request will be rejected");
    }

    let router = api::create_router(server, auth_config);
    let listener = tokio::net::TcpListener::bind(bind).await?;

    info!("MCP HTTP server listening on http://{}", bind);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
