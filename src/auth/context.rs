//! Request-scoped Zendesk credentials.
//!
//! The active [`AuthContext`] lives in a tokio task-local slot. A value is
//! only visible inside the future passed to [`scope`], so two requests served
//! concurrently, even by the same worker thread, can never observe each
//! other's credential.

use std::fmt;
use std::future::Future;

use http::HeaderValue;

use crate::auth::AuthError;
use crate::types::{BearerToken, Tenant};

tokio::task_local! {
    static CURRENT_AUTH: AuthContext;
}

/// Credential and tenant of the caller currently being served.
///
/// Immutable once created. Never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    credential: BearerToken,
    tenant: Tenant,
}

impl AuthContext {
    /// Create a validated context.
    ///
    /// The credential must be usable as an HTTP header value and the tenant
    /// must be a plain subdomain label, since it ends up in the upstream host.
    pub fn new(credential: BearerToken, tenant: Tenant) -> Result<Self, AuthError> {
        if credential.expose().trim().is_empty() {
            return Err(AuthError::InvalidContext("empty credential".to_string()));
        }
        if HeaderValue::from_str(&format!("Bearer {}", credential.expose())).is_err() {
            return Err(AuthError::InvalidContext(
                "credential contains characters not allowed in a header".to_string(),
            ));
        }
        if !tenant.is_valid_subdomain() {
            return Err(AuthError::InvalidContext(format!(
                "invalid tenant subdomain '{}'",
                tenant
            )));
        }

        Ok(Self { credential, tenant })
    }

    /// The caller's bearer credential.
    pub fn credential(&self) -> &BearerToken {
        &self.credential
    }

    /// The backend instance the credential targets.
    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("credential", &self.credential)
            .field("tenant", &self.tenant)
            .finish()
    }
}

/// Run `fut` with `ctx` as the active auth context.
///
/// Everything `fut` awaits sees `ctx` through [`current`]; nothing else does.
/// The value is gone once `fut` completes or is dropped.
pub async fn scope<F>(ctx: AuthContext, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_AUTH.scope(ctx, fut).await
}

/// The auth context of the innermost enclosing [`scope`].
pub fn current() -> Result<AuthContext, AuthError> {
    CURRENT_AUTH
        .try_with(|ctx| ctx.clone())
        .map_err(|_| AuthError::ContextMissing)
}

/// Like [`current`], without the error.
pub fn try_current() -> Option<AuthContext> {
    CURRENT_AUTH.try_with(|ctx| ctx.clone()).ok()
}
