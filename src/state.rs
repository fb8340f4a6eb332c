//! Application state traits for dependency injection
//!
//! This module defines the trait that abstracts the application state,
//! enabling the same handler and middleware code to work with both
//! production and test implementations.

use crate::assertion::AssertionResolver;
use crate::cache::HostCache;
use crate::config::Config;
use crate::repository::{ProfileRepository, TenantRepository};
use crate::service::{DomainService, TenantResolver};
use crate::vercel::DomainProvider;

/// Trait for application state that provides access to all services.
///
/// Handlers and the tenant-routing middleware are generic over this
/// trait, so integration tests can swap in in-memory repositories and
/// a stub edge provider without touching the request path.
pub trait HasServices: Clone + Send + Sync + 'static {
    /// The tenant repository type
    type TenantRepo: TenantRepository + 'static;
    /// The owner profile repository type
    type ProfileRepo: ProfileRepository + 'static;
    /// The hostname cache type
    type Cache: HostCache + 'static;
    /// The edge network provider type
    type Edge: DomainProvider + 'static;

    /// Get the application configuration
    fn config(&self) -> &Config;

    /// Get the hostname-to-tenant resolver
    fn resolver(&self) -> &TenantResolver<Self::TenantRepo, Self::ProfileRepo, Self::Cache>;

    /// Get the domain lifecycle service
    fn domain_service(&self) -> &DomainService<Self::TenantRepo, Self::Edge, Self::Cache>;

    /// Get the identity-assertion resolver
    fn assertion_resolver(&self) -> &AssertionResolver<Self::TenantRepo>;

    /// Check if the system is ready (database and cache are healthy).
    /// Returns (db_ok, cache_ok) tuple
    fn check_ready(&self) -> impl std::future::Future<Output = (bool, bool)> + Send;
}
