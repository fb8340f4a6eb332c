//! Domain models for Vitrine Core

pub mod plan;
pub mod tenant;

pub use plan::{OwnerProfile, PlanTier};
pub use tenant::{
    DnsRecord, DnsRecordType, DomainStatus, DomainVerification, TenantRecord, DEMO_TENANT_ID,
};
