//! Process configuration.
//!
//! Values come from CLI flags or their environment fallbacks (see the
//! binary); this module holds the validated result.

use std::time::Duration;

use anyhow::bail;

use crate::auth::middleware::DEFAULT_MAX_BODY_BYTES;
use crate::auth::TokenAuthConfig;
use crate::resources::DEFAULT_CACHE_TTL_SECONDS;
use crate::types::Tenant;
use crate::zendesk::DEFAULT_API_BASE_URL;

/// Default timeout for a single upstream HTTP call.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Zendesk subdomain all credentials are bound to. Without it every
    /// credentialed request is rejected.
    pub subdomain: Option<Tenant>,
    /// Instance URL template; `{subdomain}` is substituted per tenant.
    pub api_base_url: String,
    pub kb_cache_ttl: Duration,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            subdomain: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            kb_cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Build a config, rejecting a malformed subdomain up front.
    ///
    /// An empty subdomain is treated as unset.
    pub fn new(
        subdomain: Option<String>,
        api_base_url: Option<String>,
        kb_cache_ttl_secs: u64,
        request_timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let subdomain = match subdomain.map(|s| s.trim().to_string()) {
            Some(s) if s.is_empty() => None,
            Some(s) => {
                let tenant = Tenant::new(s);
                if !tenant.is_valid_subdomain() {
                    bail!("invalid Zendesk subdomain '{}'", tenant);
                }
                Some(tenant)
            }
            None => None,
        };

        if request_timeout_secs == 0 {
            bail!("request timeout must be at least one second");
        }

        Ok(Self {
            subdomain,
            api_base_url: api_base_url.unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            kb_cache_ttl: Duration::from_secs(kb_cache_ttl_secs),
            request_timeout: Duration::from_secs(request_timeout_secs),
            ..Default::default()
        })
    }

    /// Settings for the inbound auth middleware.
    pub fn token_auth(&self) -> TokenAuthConfig {
        TokenAuthConfig {
            tenant: self.subdomain.clone(),
            max_body_bytes: self.max_body_bytes,
        }
    }
}
