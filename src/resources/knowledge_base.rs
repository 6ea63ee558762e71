//! Time-bounded cache of the Help Center knowledge base.
//!
//! A full traversal touches every section and every article page, so it is
//! memoized per tenant. Concurrent callers that find a tenant's entry stale
//! wait for a single refresh instead of each starting their own; refreshes
//! for different tenants do not wait on each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::auth;
use crate::resources::ResourceError;
use crate::types::Tenant;
use crate::zendesk::models::total_articles;
use crate::zendesk::{ClientFactory, KnowledgeBase, factory};

/// Default cache TTL in seconds (1 hour).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

#[derive(Clone)]
struct CachedKnowledgeBase {
    value: Arc<KnowledgeBase>,
    fetched_at: Instant,
}

/// Memoized knowledge base, one entry per tenant.
pub struct KnowledgeBaseCache {
    factory: Arc<dyn ClientFactory>,
    ttl: Duration,
    entries: RwLock<HashMap<Tenant, CachedKnowledgeBase>>,
    /// Per-tenant lock held by whichever caller is refreshing that tenant.
    refresh_locks: Mutex<HashMap<Tenant, Arc<Mutex<()>>>>,
}

impl KnowledgeBaseCache {
    pub fn new(factory: Arc<dyn ClientFactory>, ttl: Duration) -> Self {
        Self {
            factory,
            ttl,
            entries: RwLock::new(HashMap::new()),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The knowledge base for the active caller's tenant.
    ///
    /// Served from memory while younger than the TTL. Otherwise it is
    /// fetched with the active caller's credential.
    pub async fn get(&self) -> Result<Arc<KnowledgeBase>, ResourceError> {
        let ctx = auth::current()?;
        let tenant = ctx.tenant();

        if let Some(kb) = self.fresh(tenant).await {
            debug!(%tenant, "Knowledge base served from cache");
            return Ok(kb);
        }

        let refresh_lock = self.refresh_lock(tenant).await;
        let _refreshing = refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(kb) = self.fresh(tenant).await {
            debug!(%tenant, "Knowledge base refreshed by a concurrent caller");
            return Ok(kb);
        }

        info!(%tenant, token = %ctx.credential().fingerprint(), "Refreshing knowledge base");
        let client = factory::build(self.factory.as_ref())?;
        let kb = match client.get_all_articles().await {
            Ok(kb) => Arc::new(kb),
            Err(e) => {
                warn!(%tenant, error = %e, "Knowledge base refresh failed");
                return Err(e.into());
            }
        };

        info!(
            %tenant,
            sections = kb.len(),
            articles = total_articles(&kb),
            "Knowledge base cached"
        );
        self.entries.write().await.insert(
            tenant.clone(),
            CachedKnowledgeBase {
                value: kb.clone(),
                fetched_at: Instant::now(),
            },
        );

        Ok(kb)
    }

    /// Drop every cached entry.
    #[cfg(test)]
    pub async fn invalidate(&self) {
        self.entries.write().await.clear();
    }

    async fn refresh_lock(&self, tenant: &Tenant) -> Arc<Mutex<()>> {
        self.refresh_locks
            .lock()
            .await
            .entry(tenant.clone())
            .or_default()
            .clone()
    }

    async fn fresh(&self, tenant: &Tenant) -> Option<Arc<KnowledgeBase>> {
        let entries = self.entries.read().await;
        entries
            .get(tenant)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }
}
