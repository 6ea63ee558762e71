//! Builds Zendesk clients from the active auth context.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::auth::{self, AuthContext, AuthError};
use crate::types::Tenant;
use crate::zendesk::{TicketingApi, ZendeskClient};

/// Default instance URL template; `{subdomain}` is replaced by the tenant.
pub const DEFAULT_API_BASE_URL: &str = "https://{subdomain}.zendesk.com";

/// Creates a ticketing client for a given caller.
pub trait ClientFactory: Send + Sync {
    fn create(&self, ctx: &AuthContext) -> Result<Arc<dyn TicketingApi>, AuthError>;
}

/// Build a client for the caller whose request is currently being served.
///
/// Fails with [`AuthError::ContextMissing`] outside an auth scope. Every call
/// constructs a new client.
pub fn build(factory: &dyn ClientFactory) -> Result<Arc<dyn TicketingApi>, AuthError> {
    let ctx = auth::current()?;
    factory.create(&ctx)
}

/// Production factory producing [`ZendeskClient`]s.
///
/// Holds the one `reqwest::Client` whose connection pool all per-request
/// clients share.
#[derive(Clone)]
pub struct ZendeskClientFactory {
    http: reqwest::Client,
    base_url_template: String,
}

impl ZendeskClientFactory {
    /// Create a factory.
    ///
    /// `base_url_template` may contain `{subdomain}`, which is replaced with
    /// the caller's tenant.
    pub fn new(base_url_template: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            http,
            base_url_template: base_url_template.into(),
        })
    }

    /// Instance root URL for `tenant`, always ending in `/`.
    pub fn base_url_for(&self, tenant: &Tenant) -> Result<Url, AuthError> {
        let mut raw = self
            .base_url_template
            .replace("{subdomain}", tenant.as_str());
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|e| {
            AuthError::InvalidContext(format!("cannot build API URL for tenant '{}': {}", tenant, e))
        })
    }
}

impl ClientFactory for ZendeskClientFactory {
    fn create(&self, ctx: &AuthContext) -> Result<Arc<dyn TicketingApi>, AuthError> {
        let base_url = self.base_url_for(ctx.tenant())?;
        Ok(Arc::new(ZendeskClient::new(
            self.http.clone(),
            base_url,
            ctx.credential().clone(),
        )))
    }
}
