//! Identity-assertion verification
//!
//! Verifies signed assertions against a remotely published JWK set and maps
//! the asserted owner identity to a tenant. Assertion-based routing is a
//! convenience, not a security boundary: every failure path yields `None`
//! at the resolver level and never aborts the surrounding request.

use crate::config::AssertionConfig;
use crate::error::{AppError, Result};
use crate::repository::TenantRepository;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Claims carried by an identity assertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Subject (stable identity id)
    pub sub: String,
    /// Owner email, the key used to map identity to tenant
    pub email: String,
    /// Audience
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Remotely published JWK set (the subset of fields we consume)
#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<JwkKey>,
}

#[derive(Debug, Deserialize)]
struct JwkKey {
    kty: String,
    kid: Option<String>,
    n: Option<String>,
    e: Option<String>,
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

/// Verifier for identity assertions against a remote key set
#[derive(Clone)]
pub struct AssertionVerifier {
    config: AssertionConfig,
    http_client: Client,
    cached: Arc<RwLock<Option<CachedKeys>>>,
}

impl AssertionVerifier {
    /// Create a new verifier
    pub fn new(config: AssertionConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            config,
            http_client,
            cached: Arc::new(RwLock::new(None)),
        })
    }

    /// Name of the request header carrying the assertion token
    pub fn header_name(&self) -> &str {
        &self.config.header_name
    }

    /// Create a Validation with a strict leeway (5 seconds) instead of the
    /// default 60 seconds, so expired assertions are dropped promptly.
    fn strict_validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::RS256);
        v.leeway = 5;
        let audiences: Vec<&str> = self
            .config
            .allowed_audiences
            .iter()
            .map(String::as_str)
            .collect();
        v.set_audience(&audiences);
        v
    }

    /// Fetch the key set and rebuild the kid-to-key index
    async fn refresh_keys(&self) -> Result<()> {
        let response = self
            .http_client
            .get(&self.config.jwks_url)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWKS fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "JWKS fetch failed with status {}",
                response.status()
            )));
        }

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid JWKS payload: {}", e)))?;

        let mut keys = HashMap::new();
        for key in jwks.keys {
            if key.kty != "RSA" {
                continue;
            }
            let (Some(kid), Some(n), Some(e)) = (key.kid, key.n, key.e) else {
                continue;
            };
            match DecodingKey::from_rsa_components(&n, &e) {
                Ok(decoding_key) => {
                    keys.insert(kid, decoding_key);
                }
                Err(err) => {
                    warn!("Skipping unusable JWK '{}': {}", kid, err);
                }
            }
        }

        let mut cached = self.cached.write().await;
        *cached = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        Ok(())
    }

    /// Find the decoding key for a kid, refreshing the set when it is stale
    /// or the kid is unknown (one refetch, to pick up rotated keys).
    async fn key_for(&self, kid: &str) -> Result<DecodingKey> {
        let max_age = Duration::from_secs(self.config.refresh_secs);

        {
            let cached = self.cached.read().await;
            if let Some(ref c) = *cached {
                if c.fetched_at.elapsed() < max_age {
                    if let Some(key) = c.keys.get(kid) {
                        return Ok(key.clone());
                    }
                }
            }
        }

        self.refresh_keys().await?;

        let cached = self.cached.read().await;
        cached
            .as_ref()
            .and_then(|c| c.keys.get(kid))
            .cloned()
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("No JWK published for kid '{}'", kid))
            })
    }

    /// Verify an assertion token: signature against the remote key set,
    /// audience allow-list, and temporal claims.
    pub async fn verify(&self, token: &str) -> Result<AssertionClaims> {
        if self.config.jwks_url.is_empty() || self.config.allowed_audiences.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Assertion verification is not configured"
            )));
        }

        let header = decode_header(token)?;
        let kid = header
            .kid
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Assertion is missing a kid")))?;

        let key = self.key_for(&kid).await?;
        let data = decode::<AssertionClaims>(token, &key, &self.strict_validation())?;
        Ok(data.claims)
    }
}

/// Maps verified assertion identities to tenants
pub struct AssertionResolver<R: TenantRepository> {
    verifier: AssertionVerifier,
    repo: Arc<R>,
}

impl<R: TenantRepository> AssertionResolver<R> {
    pub fn new(verifier: AssertionVerifier, repo: Arc<R>) -> Self {
        Self { verifier, repo }
    }

    /// Name of the request header carrying the assertion token
    pub fn header_name(&self) -> &str {
        self.verifier.header_name()
    }

    /// Resolve an assertion token to a tenant id. Any verification or
    /// lookup failure yields `None`.
    pub async fn resolve_identity(&self, token: &str) -> Option<String> {
        let claims = match self.verifier.verify(token).await {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Assertion rejected: {}", e);
                return None;
            }
        };

        match self.repo.find_by_owner_email(&claims.email).await {
            Ok(Some(record)) => Some(record.id),
            Ok(None) => {
                debug!("No store for asserted identity '{}'", claims.email);
                None
            }
            Err(e) => {
                warn!("Identity lookup failed: {}", e);
                None
            }
        }
    }
}
