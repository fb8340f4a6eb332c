//! Edge key-value cache layer for hostname resolution
//!
//! The cache is a capability: resolution is written once against the
//! [`HostCache`] trait, and deployments without Redis run the no-op
//! implementation. Entries are advisory — correctness never depends on the
//! cache being present or fresh.

use crate::config::RedisConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};
use std::time::Duration;

/// Cache key prefixes
mod keys {
    pub const HOST: &str = "vitrine:host";
}

/// Hostname-to-tenant cache operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostCache: Send + Sync {
    /// Look up a cached tenant id for a hostname
    async fn get_tenant(&self, hostname: &str) -> Result<Option<String>>;
    /// Store a hostname-to-tenant mapping with a bounded TTL
    async fn put_tenant(&self, hostname: &str, tenant_id: &str, ttl: Duration) -> Result<()>;
    /// Drop the mapping for a hostname
    async fn invalidate(&self, hostname: &str) -> Result<()>;
    /// Health probe
    async fn ping(&self) -> Result<()>;
}

/// Redis-backed host cache
#[derive(Clone)]
pub struct RedisHostCache {
    conn: ConnectionManager,
}

impl RedisHostCache {
    /// Create a new Redis host cache
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to create Redis client: {}", e))
        })?;

        let conn = ConnectionManager::new(client).await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to connect to Redis: {}", e))
        })?;

        Ok(Self { conn })
    }

    fn key(hostname: &str) -> String {
        format!("{}:{}", keys::HOST, hostname)
    }
}

#[async_trait]
impl HostCache for RedisHostCache {
    async fn get_tenant(&self, hostname: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(Self::key(hostname)).await?;
        Ok(value)
    }

    async fn put_tenant(&self, hostname: &str, tenant_id: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(Self::key(hostname), tenant_id, ttl.as_secs())
            .await?;
        Ok(())
    }

    async fn invalidate(&self, hostname: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(Self::key(hostname)).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// No-op cache used when `REDIS_URL` is not configured. Every lookup is a
/// miss and every write succeeds without effect.
#[derive(Clone, Default)]
pub struct NoopHostCache;

#[async_trait]
impl HostCache for NoopHostCache {
    async fn get_tenant(&self, _hostname: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn put_tenant(&self, _hostname: &str, _tenant_id: &str, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    async fn invalidate(&self, _hostname: &str) -> Result<()> {
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Deployment-selected cache backend. `REDIS_URL` picks Redis; its absence
/// picks the no-op cache, with one concrete type either way.
#[derive(Clone)]
pub enum CacheBackend {
    Redis(RedisHostCache),
    Noop(NoopHostCache),
}

impl CacheBackend {
    /// Connect to Redis when configured, otherwise run without a cache
    pub async fn new(config: Option<&RedisConfig>) -> Result<Self> {
        match config {
            Some(redis) => Ok(Self::Redis(RedisHostCache::new(redis).await?)),
            None => Ok(Self::Noop(NoopHostCache)),
        }
    }
}

#[async_trait]
impl HostCache for CacheBackend {
    async fn get_tenant(&self, hostname: &str) -> Result<Option<String>> {
        match self {
            Self::Redis(cache) => cache.get_tenant(hostname).await,
            Self::Noop(cache) => cache.get_tenant(hostname).await,
        }
    }

    async fn put_tenant(&self, hostname: &str, tenant_id: &str, ttl: Duration) -> Result<()> {
        match self {
            Self::Redis(cache) => cache.put_tenant(hostname, tenant_id, ttl).await,
            Self::Noop(cache) => cache.put_tenant(hostname, tenant_id, ttl).await,
        }
    }

    async fn invalidate(&self, hostname: &str) -> Result<()> {
        match self {
            Self::Redis(cache) => cache.invalidate(hostname).await,
            Self::Noop(cache) => cache.invalidate(hostname).await,
        }
    }

    async fn ping(&self) -> Result<()> {
        match self {
            Self::Redis(cache) => cache.ping().await,
            Self::Noop(cache) => cache.ping().await,
        }
    }
}
