//! Common test utilities: in-memory repositories, an in-memory host cache,
//! and a `HasServices` state the production router accepts.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vitrine_core::assertion::{AssertionResolver, AssertionVerifier};
use vitrine_core::cache::HostCache;
use vitrine_core::config::{
    AssertionConfig, Config, DatabaseConfig, RoutingConfig, VercelConfig,
};
use vitrine_core::domain::{DnsRecord, DomainStatus, OwnerProfile, PlanTier, TenantRecord};
use vitrine_core::error::{AppError, Result};
use vitrine_core::repository::{ProfileRepository, TenantRepository};
use vitrine_core::server::build_router;
use vitrine_core::service::{DomainService, TenantResolver};
use vitrine_core::state::HasServices;
use vitrine_core::vercel::VercelClient;

/// In-memory tenant repository. `lookups` counts store reads so tests can
/// assert how much traffic the cache absorbs.
#[derive(Default)]
pub struct InMemoryTenantRepo {
    records: Mutex<HashMap<String, TenantRecord>>,
    pub lookups: AtomicUsize,
    read_delay: Mutex<Option<Duration>>,
    reads_fail: AtomicBool,
}

impl InMemoryTenantRepo {
    pub fn new(records: Vec<TenantRecord>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().map(|r| (r.id.clone(), r)).collect()),
            lookups: AtomicUsize::new(0),
            read_delay: Mutex::new(None),
            reads_fail: AtomicBool::new(false),
        }
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Make every read stall, simulating an overloaded database.
    pub fn stall_reads(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    /// Make every read fail, simulating a database outage.
    pub fn fail_reads(&self) {
        self.reads_fail.store(true, Ordering::SeqCst);
    }

    async fn read_gate(&self) -> Result<()> {
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<TenantRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    fn find<F>(&self, predicate: F) -> Option<TenantRecord>
    where
        F: Fn(&TenantRecord) -> bool,
    {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|r| predicate(r))
            .min_by_key(|r| r.created_at)
            .cloned()
    }

    fn update<F>(&self, id: &str, mutate: F) -> Result<TenantRecord>
    where
        F: FnOnce(&mut TenantRecord),
    {
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Store {} not found", id)))?;
        mutate(record);
        record.updated_at = chrono::Utc::now();
        Ok(record.clone())
    }
}

#[async_trait]
impl TenantRepository for InMemoryTenantRepo {
    async fn find_by_id(&self, id: &str) -> Result<Option<TenantRecord>> {
        self.read_gate().await?;
        Ok(self.find(|r| r.id == id))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<TenantRecord>> {
        self.read_gate().await?;
        Ok(self.find(|r| r.slug.as_deref() == Some(slug)))
    }

    async fn find_by_custom_domain(&self, domain: &str) -> Result<Option<TenantRecord>> {
        self.read_gate().await?;
        Ok(self.find(|r| r.custom_domain.as_deref() == Some(domain)))
    }

    async fn find_by_owner_email(&self, email: &str) -> Result<Option<TenantRecord>> {
        self.read_gate().await?;
        Ok(self.find(|r| r.owner_email == email))
    }

    async fn set_domain_registration(
        &self,
        id: &str,
        domain: &str,
        dns_record: &DnsRecord,
    ) -> Result<TenantRecord> {
        self.update(id, |r| {
            r.custom_domain = Some(domain.to_string());
            r.domain_status = DomainStatus::PendingDns;
            r.dns_record = Some(sqlx::types::Json(dns_record.clone()));
            r.domain_verified = false;
            r.domain_misconfigured = false;
            r.last_synced_at = Some(chrono::Utc::now());
        })
    }

    async fn set_domain_verification(
        &self,
        id: &str,
        status: DomainStatus,
        verified: bool,
        misconfigured: bool,
    ) -> Result<TenantRecord> {
        self.update(id, |r| {
            r.domain_status = status;
            r.domain_verified = verified;
            r.domain_misconfigured = misconfigured;
            r.last_synced_at = Some(chrono::Utc::now());
        })
    }

    async fn touch_domain_sync(&self, id: &str) -> Result<()> {
        self.update(id, |r| {
            r.last_synced_at = Some(chrono::Utc::now());
        })?;
        Ok(())
    }

    async fn clear_domain(&self, id: &str) -> Result<TenantRecord> {
        self.update(id, |r| {
            r.custom_domain = None;
            r.domain_status = DomainStatus::Unverified;
            r.dns_record = None;
            r.domain_verified = false;
            r.domain_misconfigured = false;
        })
    }
}

/// In-memory owner profile repository
#[derive(Default)]
pub struct InMemoryProfileRepo {
    profiles: Mutex<HashMap<String, OwnerProfile>>,
}

impl InMemoryProfileRepo {
    pub fn new(profiles: Vec<OwnerProfile>) -> Self {
        Self {
            profiles: Mutex::new(profiles.into_iter().map(|p| (p.email.clone(), p)).collect()),
        }
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepo {
    async fn find_by_email(&self, email: &str) -> Result<Option<OwnerProfile>> {
        Ok(self.profiles.lock().unwrap().get(email).cloned())
    }
}

/// In-memory host cache. TTLs are accepted and ignored.
#[derive(Default)]
pub struct InMemoryHostCache {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryHostCache {
    pub fn entry(&self, hostname: &str) -> Option<String> {
        self.entries.lock().unwrap().get(hostname).cloned()
    }

    pub fn seed(&self, hostname: &str, tenant_id: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(hostname.to_string(), tenant_id.to_string());
    }
}

#[async_trait]
impl HostCache for InMemoryHostCache {
    async fn get_tenant(&self, hostname: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().unwrap().get(hostname).cloned())
    }

    async fn put_tenant(&self, hostname: &str, tenant_id: &str, _ttl: Duration) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(hostname.to_string(), tenant_id.to_string());
        Ok(())
    }

    async fn invalidate(&self, hostname: &str) -> Result<()> {
        self.entries.lock().unwrap().remove(hostname);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Test state accepted by the production router
#[derive(Clone)]
pub struct TestState {
    pub config: Arc<Config>,
    pub tenants: Arc<InMemoryTenantRepo>,
    pub profiles: Arc<InMemoryProfileRepo>,
    pub cache: Arc<InMemoryHostCache>,
    resolver: Arc<TenantResolver<InMemoryTenantRepo, InMemoryProfileRepo, InMemoryHostCache>>,
    domain_service: Arc<DomainService<InMemoryTenantRepo, VercelClient, InMemoryHostCache>>,
    assertion_resolver: Arc<AssertionResolver<InMemoryTenantRepo>>,
}

impl HasServices for TestState {
    type TenantRepo = InMemoryTenantRepo;
    type ProfileRepo = InMemoryProfileRepo;
    type Cache = InMemoryHostCache;
    type Edge = VercelClient;

    fn config(&self) -> &Config {
        &self.config
    }

    fn resolver(&self) -> &TenantResolver<Self::TenantRepo, Self::ProfileRepo, Self::Cache> {
        &self.resolver
    }

    fn domain_service(&self) -> &DomainService<Self::TenantRepo, Self::Edge, Self::Cache> {
        &self.domain_service
    }

    fn assertion_resolver(&self) -> &AssertionResolver<Self::TenantRepo> {
        &self.assertion_resolver
    }

    async fn check_ready(&self) -> (bool, bool) {
        (true, true)
    }
}

pub struct TestStateBuilder {
    stores: Vec<TenantRecord>,
    profiles: Vec<OwnerProfile>,
    vercel_api_base: String,
    assertion: Option<AssertionConfig>,
    resolve_timeout_ms: u64,
}

impl TestStateBuilder {
    pub fn store(mut self, record: TenantRecord) -> Self {
        self.stores.push(record);
        self
    }

    pub fn profile(mut self, profile: OwnerProfile) -> Self {
        self.profiles.push(profile);
        self
    }

    /// Point the Vercel client at a mock server
    pub fn vercel_api_base(mut self, base: impl Into<String>) -> Self {
        self.vercel_api_base = base.into();
        self
    }

    pub fn assertion(mut self, config: AssertionConfig) -> Self {
        self.assertion = Some(config);
        self
    }

    /// Shrink the router's resolution deadline so timeout tests run fast
    pub fn resolve_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.resolve_timeout_ms = timeout_ms;
        self
    }

    pub fn build(self) -> TestState {
        let config = Config {
            http_host: "127.0.0.1".to_string(),
            http_port: 0,
            database: DatabaseConfig {
                url: "mysql://unused/test".to_string(),
                max_connections: 1,
                min_connections: 1,
            },
            redis: None,
            routing: RoutingConfig {
                root_domain: "vitrine.shop".to_string(),
                demo_host: "demo.vitrine.shop".to_string(),
                cache_ttl_secs: 3600,
                resolve_timeout_ms: self.resolve_timeout_ms,
            },
            vercel: VercelConfig {
                api_base: self.vercel_api_base.clone(),
                token: "test-token".to_string(),
                project_id: "prj_test".to_string(),
                team_id: None,
                apex_ip: "76.76.21.21".to_string(),
                cname_target: "cname.vercel-dns.com".to_string(),
            },
            assertion: self.assertion.unwrap_or(AssertionConfig {
                jwks_url: String::new(),
                allowed_audiences: Vec::new(),
                header_name: "x-identity-assertion".to_string(),
                refresh_secs: 3600,
            }),
        };

        let tenants = Arc::new(InMemoryTenantRepo::new(self.stores));
        let profiles = Arc::new(InMemoryProfileRepo::new(self.profiles));
        let cache = Arc::new(InMemoryHostCache::default());

        let resolver = Arc::new(TenantResolver::new(
            tenants.clone(),
            profiles.clone(),
            cache.clone(),
            config.routing.clone(),
        ));
        let vercel_client =
            VercelClient::new(config.vercel.clone()).expect("vercel client for tests");
        let domain_service = Arc::new(DomainService::new(
            tenants.clone(),
            Arc::new(vercel_client),
            cache.clone(),
            config.vercel.clone(),
        ));
        let verifier =
            AssertionVerifier::new(config.assertion.clone()).expect("verifier for tests");
        let assertion_resolver = Arc::new(AssertionResolver::new(verifier, tenants.clone()));

        TestState {
            config: Arc::new(config),
            tenants,
            profiles,
            cache,
            resolver,
            domain_service,
            assertion_resolver,
        }
    }
}

impl TestState {
    pub fn builder() -> TestStateBuilder {
        TestStateBuilder {
            stores: Vec::new(),
            profiles: Vec::new(),
            vercel_api_base: "http://127.0.0.1:1".to_string(),
            assertion: None,
            resolve_timeout_ms: 2000,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.clone())
    }
}

/// A store with a connected custom domain
pub fn connected_store(id: &str, domain: &str, owner: &str) -> TenantRecord {
    TenantRecord {
        id: id.to_string(),
        name: format!("{} store", id),
        custom_domain: Some(domain.to_string()),
        domain_status: DomainStatus::Connected,
        domain_verified: true,
        owner_email: owner.to_string(),
        ..Default::default()
    }
}

/// A store reachable by slug under the root domain
pub fn slug_store(id: &str, slug: &str, owner: &str) -> TenantRecord {
    TenantRecord {
        id: id.to_string(),
        name: format!("{} store", id),
        slug: Some(slug.to_string()),
        owner_email: owner.to_string(),
        ..Default::default()
    }
}

/// An owner profile entitled to branded routing
pub fn pro_profile(email: &str) -> OwnerProfile {
    OwnerProfile {
        email: email.to_string(),
        plan_tier: PlanTier::Pro,
        ..Default::default()
    }
}

/// An owner profile without branded routing
pub fn free_profile(email: &str) -> OwnerProfile {
    OwnerProfile {
        email: email.to_string(),
        plan_tier: PlanTier::Free,
        ..Default::default()
    }
}
