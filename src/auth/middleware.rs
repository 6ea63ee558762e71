//! Bearer-token middleware for the MCP HTTP endpoint.
//!
//! Decides, for each inbound request, whether it may pass without a
//! credential, must be rejected, or carries a credential that becomes the
//! request's [`AuthContext`].

use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

use crate::auth::context::{self, AuthContext};
use crate::types::{BearerToken, Tenant};

/// Liveness path, exempt from every check.
pub const HEALTH_PATH: &str = "/health";

/// Expected authorization scheme, including the separating space.
pub const BEARER_PREFIX: &str = "Bearer ";

/// MCP methods that touch no tenant data and need no credential.
pub const UNAUTHENTICATED_METHODS: [&str; 4] =
    ["ping", "tools/list", "prompts/list", "resources/list"];

/// Default upper bound for a buffered request body (4 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Settings the middleware needs from process configuration.
#[derive(Debug, Clone)]
pub struct TokenAuthConfig {
    /// Tenant attached to every accepted credential. `None` rejects all
    /// credentialed requests.
    pub tenant: Option<Tenant>,
    /// Largest body the middleware will buffer for inspection.
    pub max_body_bytes: usize,
}

impl TokenAuthConfig {
    pub fn new(tenant: Option<Tenant>) -> Self {
        Self {
            tenant,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Why a request was turned away at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No `Authorization` header, or an empty one.
    EmptyAuthorizationHeader,
    /// Header present but not a `Bearer` credential.
    UnsupportedAuthorizationType,
    /// `Bearer` scheme with nothing after it.
    EmptyBearerToken,
    /// Building the auth context failed.
    InvalidToken,
    /// The request body could not be buffered.
    UnreadableBody,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnreadableBody => StatusCode::BAD_REQUEST,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// JSON payload sent back to the caller.
    pub fn body(&self) -> Value {
        match self {
            Self::EmptyAuthorizationHeader => json!({
                "error": "Unauthorized: Empty Authorization Header",
                "code": 401,
            }),
            Self::UnsupportedAuthorizationType => json!({
                "error": "Unauthorized: Only 'Bearer <OAuthToken>' type is supported."
            }),
            Self::EmptyBearerToken => json!({
                "error": "Unauthorized: Empty Bearer token"
            }),
            Self::InvalidToken => json!({
                "error": "Unauthorized: Invalid JWT token"
            }),
            Self::UnreadableBody => json!({
                "error": "Bad Request: unreadable request body",
                "code": 400,
            }),
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Only body-bearing verbs are subject to credential checks.
fn requires_credentials(method: &Method) -> bool {
    *method == Method::POST || *method == Method::HEAD
}

/// Return the MCP method name if the body is an exempt introspection call.
fn introspection_method(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    let parsed: Value = match serde_json::from_slice(body) {
        Ok(v) => v,
        Err(e) => {
            debug!("Request body is not JSON, no exemption: {}", e);
            return None;
        }
    };
    let method = parsed.get("method")?.as_str()?;
    UNAUTHENTICATED_METHODS
        .contains(&method)
        .then(|| method.to_string())
}

/// Turn the `Authorization` header and configured tenant into an auth context.
pub fn authenticate(
    header: Option<&HeaderValue>,
    tenant: Option<&Tenant>,
) -> Result<AuthContext, Rejection> {
    let header = match header {
        Some(h) if !h.is_empty() => h,
        _ => return Err(Rejection::EmptyAuthorizationHeader),
    };

    let value = header
        .to_str()
        .map_err(|_| Rejection::UnsupportedAuthorizationType)?;

    let token = match value.strip_prefix(BEARER_PREFIX) {
        Some(rest) => rest.trim(),
        None => {
            let scheme = value.split_once(' ').map(|(s, _)| s).unwrap_or("UnknownType");
            warn!(scheme = %scheme, "Unsupported authorization type");
            return Err(Rejection::UnsupportedAuthorizationType);
        }
    };

    if token.is_empty() {
        return Err(Rejection::EmptyBearerToken);
    }

    let Some(tenant) = tenant else {
        warn!("No Zendesk subdomain configured, cannot scope credential");
        return Err(Rejection::InvalidToken);
    };

    AuthContext::new(BearerToken::new(token), tenant.clone()).map_err(|e| {
        warn!(error = %e, "Failed to build auth context");
        Rejection::InvalidToken
    })
}

/// axum middleware populating the per-request auth context.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn user_token_middleware(
    State(config): State<Arc<TokenAuthConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::debug_span!(
        "user_token_auth",
        %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    handle(config, request, next).instrument(span).await
}

async fn handle(config: Arc<TokenAuthConfig>, request: Request, next: Next) -> Response {
    if request.uri().path() == HEALTH_PATH {
        return next.run(request).await;
    }

    if !requires_credentials(request.method()) {
        debug!("Method not subject to credential checks, passing through");
        return next.run(request).await;
    }

    // Buffer the body so it can be inspected and then replayed unchanged.
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, config.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Failed to read request body");
            return Rejection::UnreadableBody.into_response();
        }
    };
    let exempt = introspection_method(&bytes);
    let mut request = Request::from_parts(parts, Body::from(bytes));

    if let Some(method) = exempt {
        debug!(mcp_method = %method, "Allowing MCP protocol method without auth");
        return next.run(request).await;
    }

    let ctx = match authenticate(
        request.headers().get(AUTHORIZATION),
        config.tenant.as_ref(),
    ) {
        Ok(ctx) => ctx,
        Err(rejection) => {
            warn!(?rejection, "Request rejected");
            return rejection.into_response();
        }
    };

    info!(
        tenant = %ctx.tenant(),
        token = %ctx.credential().fingerprint(),
        "Bearer credential accepted"
    );

    // Extensions carry the context across tasks the dispatcher may spawn;
    // the scope covers everything awaited on this one.
    request.extensions_mut().insert(ctx.clone());
    context::scope(ctx, next.run(request)).await
}
