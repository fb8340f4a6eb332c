//! Custom-domain lifecycle management
//!
//! Orchestrates Register, CheckStatus, and Disconnect against the edge
//! network, and owns every domain-related mutation of a tenant record.

use crate::cache::HostCache;
use crate::config::VercelConfig;
use crate::domain::{DnsRecord, DnsRecordType, TenantRecord};
use crate::error::{AppError, Result};
use crate::repository::TenantRepository;
use crate::service::resolution::normalize_host;
use crate::vercel::DomainProvider;
use std::sync::Arc;
use tracing::{info, warn};

/// Domain lifecycle service
pub struct DomainService<R: TenantRepository, E: DomainProvider, C: HostCache> {
    repo: Arc<R>,
    provider: Arc<E>,
    cache: Arc<C>,
    config: VercelConfig,
}

/// Check that a value looks like a bare, fully-qualified domain name.
fn validate_domain(domain: &str) -> Result<()> {
    if domain.len() < 4 || domain.len() > 253 {
        return Err(AppError::Validation(format!(
            "'{}' is not a valid domain name",
            domain
        )));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(AppError::Validation(format!(
            "'{}' must be a fully-qualified domain name",
            domain
        )));
    }

    for label in &labels {
        let valid = !label.is_empty()
            && label.len() <= 63
            && label
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !label.starts_with('-')
            && !label.ends_with('-');
        if !valid {
            return Err(AppError::Validation(format!(
                "'{}' is not a valid domain name",
                domain
            )));
        }
    }

    Ok(())
}

impl<R: TenantRepository, E: DomainProvider, C: HostCache> DomainService<R, E, C> {
    pub fn new(repo: Arc<R>, provider: Arc<E>, cache: Arc<C>, config: VercelConfig) -> Self {
        Self {
            repo,
            provider,
            cache,
            config,
        }
    }

    /// Derive the DNS record a tenant must publish for a domain.
    ///
    /// An apex domain (two labels) needs an `A` record at the zone root; a
    /// subdomain needs a `CNAME` on its first label.
    pub fn dns_record_for(&self, domain: &str) -> DnsRecord {
        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() == 2 {
            DnsRecord {
                record_type: DnsRecordType::A,
                name: "@".to_string(),
                value: self.config.apex_ip.clone(),
            }
        } else {
            DnsRecord {
                record_type: DnsRecordType::Cname,
                name: labels[0].to_string(),
                value: self.config.cname_target.clone(),
            }
        }
    }

    /// Register a custom domain for a tenant: attach it to the platform
    /// deployment and persist `pending_dns` plus the derived DNS record.
    ///
    /// Provider failures are hard errors; registration must never fail
    /// silently.
    pub async fn register(&self, tenant_id: &str, domain: &str) -> Result<TenantRecord> {
        let record = self
            .repo
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Store {} not found", tenant_id)))?;

        let domain = normalize_host(domain);
        validate_domain(&domain)?;

        // One domain, one store.
        if let Some(other) = self.repo.find_by_custom_domain(&domain).await? {
            if other.id != record.id {
                return Err(AppError::Conflict(format!(
                    "Domain '{}' is already claimed by another store",
                    domain
                )));
            }
        }

        let dns_record = self.dns_record_for(&domain);

        self.provider.attach_domain(&domain).await?;

        let updated = self
            .repo
            .set_domain_registration(&record.id, &domain, &dns_record)
            .await?;

        // A stale mapping for this hostname must not outlive the change.
        if let Err(e) = self.cache.invalidate(&domain).await {
            warn!("Cache invalidation failed for '{}': {}", domain, e);
        }

        info!(
            "Registered domain '{}' for store '{}' ({:?} record)",
            domain, record.id, dns_record.record_type
        );

        Ok(updated)
    }

    /// Poll the provider for verification progress and persist the
    /// classified lifecycle state.
    ///
    /// The verification trigger is best effort; only the status fetch can
    /// fail the call, and then only the last-synced timestamp is persisted.
    pub async fn check_status(&self, tenant_id: &str) -> Result<TenantRecord> {
        let record = self
            .repo
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Store {} not found", tenant_id)))?;

        let domain = record.custom_domain.clone().ok_or_else(|| {
            AppError::NotFound(format!("Store {} has no custom domain", tenant_id))
        })?;

        if let Err(e) = self.provider.trigger_verification(&domain).await {
            warn!("Verification trigger failed for '{}': {}", domain, e);
        }

        let verification = match self.provider.domain_status(&domain).await {
            Ok(verification) => verification,
            Err(e) => {
                if let Err(sync_err) = self.repo.touch_domain_sync(&record.id).await {
                    warn!(
                        "Sync timestamp update failed for store '{}': {}",
                        record.id, sync_err
                    );
                }
                return Err(e);
            }
        };

        let status = verification.classify();
        let updated = self
            .repo
            .set_domain_verification(
                &record.id,
                status,
                verification.verified,
                verification.misconfigured,
            )
            .await?;

        info!(
            "Domain '{}' for store '{}' is {}",
            domain, record.id, status
        );

        Ok(updated)
    }

    /// Disconnect a tenant's custom domain: detach it from the platform
    /// deployment (best effort), drop the cached hostname mapping, and
    /// clear all local domain state.
    pub async fn disconnect(&self, tenant_id: &str) -> Result<TenantRecord> {
        let record = self
            .repo
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Store {} not found", tenant_id)))?;

        if let Some(domain) = &record.custom_domain {
            // Local state is cleared regardless; an orphaned remote
            // attachment is retried on the next register or disconnect.
            if let Err(e) = self.provider.detach_domain(domain).await {
                warn!("Remote detach failed for '{}': {}", domain, e);
            }

            if let Err(e) = self.cache.invalidate(domain).await {
                warn!("Cache invalidation failed for '{}': {}", domain, e);
            }
        }

        let updated = self.repo.clear_domain(&record.id).await?;

        info!("Disconnected domain for store '{}'", record.id);

        Ok(updated)
    }
}
