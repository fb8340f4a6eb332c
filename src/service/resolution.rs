//! Tiered hostname-to-tenant resolution
//!
//! Lookup order: literal demo host, then edge cache, then the persistent
//! store with a priority-ordered match (custom domain, slug, raw tenant id)
//! and a plan-entitlement gate. The cache is advisory; every infrastructure
//! failure resolves closed.

use crate::cache::HostCache;
use crate::config::RoutingConfig;
use crate::domain::{TenantRecord, DEMO_TENANT_ID};
use crate::error::{AppError, Result};
use crate::repository::{ProfileRepository, TenantRepository};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Hostname-to-tenant resolution service
pub struct TenantResolver<R: TenantRepository, P: ProfileRepository, C: HostCache> {
    repo: Arc<R>,
    profiles: Arc<P>,
    cache: Arc<C>,
    routing: RoutingConfig,
}

/// Lowercase a hostname and strip any port suffix and trailing dot.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().to_lowercase();
    let host = host.split(':').next().unwrap_or(&host);
    host.trim_end_matches('.').to_string()
}

impl<R: TenantRepository, P: ProfileRepository, C: HostCache> TenantResolver<R, P, C> {
    pub fn new(repo: Arc<R>, profiles: Arc<P>, cache: Arc<C>, routing: RoutingConfig) -> Self {
        Self {
            repo,
            profiles,
            cache,
            routing,
        }
    }

    /// The bare label(s) in front of the root domain, if the hostname is a
    /// root-domain subdomain.
    fn slug_candidate(&self, host: &str) -> Option<String> {
        host.strip_suffix(&format!(".{}", self.routing.root_domain))
            .filter(|candidate| !candidate.is_empty())
            .map(str::to_string)
    }

    /// Resolve a hostname to a tenant id.
    ///
    /// Returns `NotFound` when no record matches and `Forbidden` when a
    /// record matches but the owner's plan does not include branded routing.
    pub async fn resolve(&self, hostname: &str) -> Result<String> {
        let host = normalize_host(hostname);
        if host.is_empty() {
            return Err(AppError::NotFound("Empty hostname".to_string()));
        }

        // The demo storefront bypasses the store and the cache entirely.
        if host == self.routing.demo_host {
            return Ok(DEMO_TENANT_ID.to_string());
        }

        // Cache hits were entitlement-checked at write time.
        match self.cache.get_tenant(&host).await {
            Ok(Some(tenant_id)) => {
                debug!("Cache hit for '{}': {}", host, tenant_id);
                return Ok(tenant_id);
            }
            Ok(None) => {}
            Err(e) => {
                // Advisory cache: a broken cache degrades to a miss.
                warn!("Cache lookup failed for '{}': {}", host, e);
            }
        }

        let record = self
            .lookup_record(&host)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No store for hostname '{}'", host)))?;

        self.check_entitlement(&record).await?;

        if let Err(e) = self
            .cache
            .put_tenant(
                &host,
                &record.id,
                Duration::from_secs(self.routing.cache_ttl_secs),
            )
            .await
        {
            warn!("Cache write failed for '{}': {}", host, e);
        }

        Ok(record.id)
    }

    /// Priority-ordered store lookup: custom domain, then slug, then raw
    /// tenant id. All fields are queried so a hostname matching two distinct
    /// tenants is detected rather than silently resolved.
    async fn lookup_record(&self, host: &str) -> Result<Option<TenantRecord>> {
        let candidate = self.slug_candidate(host);

        let by_domain = self.repo.find_by_custom_domain(host).await?;
        let (by_slug, by_id) = match candidate.as_deref() {
            Some(candidate) => (
                self.repo.find_by_slug(candidate).await?,
                self.repo.find_by_id(candidate).await?,
            ),
            None => (None, None),
        };

        let mut matches: Vec<TenantRecord> = Vec::new();
        for record in [by_domain, by_slug, by_id].into_iter().flatten() {
            if !matches.iter().any(|m: &TenantRecord| m.id == record.id) {
                matches.push(record);
            }
        }

        if matches.len() > 1 {
            let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
            error!(
                "Hostname '{}' matches multiple stores {:?}; taking highest-priority match",
                host, ids
            );
        }

        Ok(matches.into_iter().next())
    }

    /// Branded routing requires the owner's plan (or an admin override).
    async fn check_entitlement(&self, record: &TenantRecord) -> Result<()> {
        let profile = self
            .profiles
            .find_by_email(&record.owner_email)
            .await?
            .ok_or_else(|| {
                warn!(
                    "No owner profile '{}' for store '{}'",
                    record.owner_email, record.id
                );
                AppError::Forbidden("Store owner has no profile".to_string())
            })?;

        if !profile.can_use_custom_domains() {
            warn!(
                "Store '{}' resolved but owner plan '{}' lacks custom-domain entitlement",
                record.id, profile.plan_tier
            );
            return Err(AppError::Forbidden(
                "Owner plan does not include branded routing".to_string(),
            ));
        }

        Ok(())
    }
}
