//! HTTP middleware for Vitrine Core
//!
//! This module provides the tenant-routing middleware that maps inbound
//! hostnames onto the internal per-tenant namespace.

pub mod tenant_router;

pub use tenant_router::tenant_router;
