//! Business logic services

pub mod domains;
pub mod resolution;

pub use domains::DomainService;
pub use resolution::TenantResolver;
