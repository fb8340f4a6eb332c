//! Configuration management for Vitrine Core

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration (absent means the edge cache is disabled)
    pub redis: Option<RedisConfig>,
    /// Tenant routing configuration
    pub routing: RoutingConfig,
    /// Vercel domain API configuration
    pub vercel: VercelConfig,
    /// Identity-assertion configuration
    pub assertion: AssertionConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Hostname-to-tenant routing configuration
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Platform root domain (e.g. "vitrine.shop"); `{slug}.{root_domain}`
    /// hostnames route to the matching tenant
    pub root_domain: String,
    /// Fixed hostname that resolves to the sentinel demo tenant
    pub demo_host: String,
    /// Hostname-to-tenant cache entry TTL in seconds
    pub cache_ttl_secs: u64,
    /// Overall budget for one hostname resolution, in milliseconds
    pub resolve_timeout_ms: u64,
}

/// Vercel domain API configuration
#[derive(Debug, Clone)]
pub struct VercelConfig {
    /// API base URL (overridable for tests)
    pub api_base: String,
    /// Bearer token for the Vercel API
    pub token: String,
    /// Project the platform deployment lives in
    pub project_id: String,
    /// Optional team scope appended as `teamId` query parameter
    pub team_id: Option<String>,
    /// Fixed IPv4 target for apex `A` records
    pub apex_ip: String,
    /// Fixed hostname target for subdomain `CNAME` records
    pub cname_target: String,
}

/// Identity-assertion verification configuration
#[derive(Debug, Clone)]
pub struct AssertionConfig {
    /// URL of the remotely published JWK set
    pub jwks_url: String,
    /// Accepted `aud` claim values
    pub allowed_audiences: Vec<String>,
    /// Request header carrying the assertion token
    pub header_name: String,
    /// Seconds a fetched key set is considered fresh
    pub refresh_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            redis: env::var("REDIS_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .map(|url| RedisConfig { url }),
            routing: {
                let root_domain = env::var("ROOT_DOMAIN")
                    .unwrap_or_else(|_| "vitrine.shop".to_string())
                    .to_lowercase();
                RoutingConfig {
                    demo_host: env::var("DEMO_HOST")
                        .unwrap_or_else(|_| format!("demo.{}", root_domain))
                        .to_lowercase(),
                    root_domain,
                    cache_ttl_secs: env::var("CACHE_TTL_SECS")
                        .unwrap_or_else(|_| "3600".to_string())
                        .parse()
                        .unwrap_or(3600),
                    resolve_timeout_ms: env::var("RESOLVE_TIMEOUT_MS")
                        .unwrap_or_else(|_| "5000".to_string())
                        .parse()
                        .unwrap_or(5000),
                }
            },
            vercel: VercelConfig {
                api_base: env::var("VERCEL_API_BASE")
                    .unwrap_or_else(|_| "https://api.vercel.com".to_string()),
                token: env::var("VERCEL_TOKEN").context("VERCEL_TOKEN is required")?,
                project_id: env::var("VERCEL_PROJECT_ID")
                    .context("VERCEL_PROJECT_ID is required")?,
                team_id: env::var("VERCEL_TEAM_ID").ok(),
                apex_ip: env::var("APEX_A_RECORD_IP")
                    .unwrap_or_else(|_| "76.76.21.21".to_string()),
                cname_target: env::var("CNAME_TARGET")
                    .unwrap_or_else(|_| "cname.vercel-dns.com".to_string()),
            },
            assertion: AssertionConfig {
                jwks_url: env::var("ASSERTION_JWKS_URL").unwrap_or_default(),
                allowed_audiences: env::var("ASSERTION_AUDIENCES")
                    .map(|s| {
                        s.split(',')
                            .map(|a| a.trim().to_string())
                            .filter(|a| !a.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
                header_name: env::var("ASSERTION_HEADER")
                    .unwrap_or_else(|_| "x-identity-assertion".to_string())
                    .to_lowercase(),
                refresh_secs: env::var("JWKS_REFRESH_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
