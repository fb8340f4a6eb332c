//! Vitrine Core - Tenant Routing & Domain Lifecycle Backend
//!
//! This crate provides the routing core for the Vitrine commerce platform:
//! per-request hostname-to-tenant resolution, custom-domain lifecycle
//! management against the Vercel edge network, and identity-assertion
//! based auto-routing.

pub mod api;
pub mod assertion;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod repository;
pub mod server;
pub mod service;
pub mod state;
pub mod vercel;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
