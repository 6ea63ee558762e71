// HTTP surface: health check plus the MCP endpoint behind the token middleware

use std::sync::Arc;

use axum::{Router, http::StatusCode, middleware, response::Json, routing::get};
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{HEALTH_PATH, TokenAuthConfig, user_token_middleware};
use crate::server::ZendeskMcpServer;

/// Path the MCP service is mounted at.
pub const MCP_PATH: &str = "/mcp";

pub fn create_router(server: ZendeskMcpServer, auth_config: TokenAuthConfig) -> Router {
    // Stateless mode: every POST is served independently, with no session state.
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            stateful_mode: false,
            ..Default::default()
        },
    );

    Router::new()
        .route(HEALTH_PATH, get(health_check))
        .nest_service(MCP_PATH, service)
        .layer(middleware::from_fn_with_state(
            Arc::new(auth_config),
            user_token_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
