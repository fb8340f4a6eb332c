//! Vercel domain API client
//!
//! Attaching, verifying, and detaching custom domains on the platform's
//! Vercel project. Provider outcomes are modeled as tagged types so callers
//! handle every case explicitly instead of branching on ad hoc JSON fields.

use crate::config::VercelConfig;
use crate::domain::DomainVerification;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

/// Outcome of attaching a domain to the platform project.
///
/// "Already exists" is a success for registration purposes: attaching is
/// idempotent from the tenant's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached,
    AlreadyExists,
}

/// Error payload returned by the Vercel API
#[derive(Debug, Deserialize)]
struct VercelErrorBody {
    error: VercelErrorDetail,
}

#[derive(Debug, Deserialize)]
struct VercelErrorDetail {
    code: String,
    message: String,
}

/// Project domain representation (subset we consume)
#[derive(Debug, Deserialize)]
struct ProjectDomain {
    verified: bool,
}

/// Domain configuration check response
#[derive(Debug, Deserialize)]
struct DomainConfig {
    misconfigured: bool,
}

/// Operations the domain lifecycle manager needs from the edge network
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainProvider: Send + Sync {
    /// Attach a domain to the platform deployment
    async fn attach_domain(&self, domain: &str) -> Result<AttachOutcome>;
    /// Ask the provider to re-run domain verification
    async fn trigger_verification(&self, domain: &str) -> Result<()>;
    /// Fetch the current verification flags for a domain
    async fn domain_status(&self, domain: &str) -> Result<DomainVerification>;
    /// Remove a domain from the platform deployment
    async fn detach_domain(&self, domain: &str) -> Result<()>;
}

/// Vercel API client
#[derive(Clone)]
pub struct VercelClient {
    config: VercelConfig,
    http_client: Client,
}

impl VercelClient {
    /// Create a new Vercel client
    pub fn new(config: VercelConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Build a full URL, appending the team scope when configured
    fn url(&self, path: &str) -> String {
        match &self.config.team_id {
            Some(team) => format!("{}{}?teamId={}", self.config.api_base, path, team),
            None => format!("{}{}", self.config.api_base, path),
        }
    }

    /// Extract a readable message from an error response
    async fn error_message(response: reqwest::Response) -> (StatusCode, String, String) {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<VercelErrorBody>(&body) {
            Ok(parsed) => (status, parsed.error.code, parsed.error.message),
            Err(_) => (status, "unknown".to_string(), body),
        }
    }
}

#[async_trait]
impl DomainProvider for VercelClient {
    async fn attach_domain(&self, domain: &str) -> Result<AttachOutcome> {
        let url = self.url(&format!(
            "/v10/projects/{}/domains",
            self.config.project_id
        ));

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&serde_json::json!({ "name": domain }))
            .send()
            .await
            .map_err(|e| AppError::EdgeProvider(format!("Failed to attach domain: {}", e)))?;

        if response.status().is_success() {
            return Ok(AttachOutcome::Attached);
        }

        let (status, code, message) = Self::error_message(response).await;
        if code.contains("already") {
            // The domain is attached from a previous attempt; registration
            // is idempotent.
            return Ok(AttachOutcome::AlreadyExists);
        }

        Err(AppError::EdgeProvider(format!(
            "Failed to attach domain '{}': {} - {}",
            domain, status, message
        )))
    }

    async fn trigger_verification(&self, domain: &str) -> Result<()> {
        let url = self.url(&format!(
            "/v9/projects/{}/domains/{}/verify",
            self.config.project_id, domain
        ));

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| AppError::EdgeProvider(format!("Failed to trigger verification: {}", e)))?;

        if response.status().is_success() {
            return Ok(());
        }

        let (status, _, message) = Self::error_message(response).await;
        Err(AppError::EdgeProvider(format!(
            "Failed to trigger verification for '{}': {} - {}",
            domain, status, message
        )))
    }

    async fn domain_status(&self, domain: &str) -> Result<DomainVerification> {
        let url = self.url(&format!(
            "/v9/projects/{}/domains/{}",
            self.config.project_id, domain
        ));

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| AppError::EdgeProvider(format!("Failed to fetch domain: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "Domain '{}' is not attached to the project",
                domain
            )));
        }

        if !response.status().is_success() {
            let (status, _, message) = Self::error_message(response).await;
            return Err(AppError::EdgeProvider(format!(
                "Failed to fetch domain '{}': {} - {}",
                domain, status, message
            )));
        }

        let project_domain: ProjectDomain = response
            .json()
            .await
            .map_err(|e| AppError::EdgeProvider(format!("Failed to parse domain response: {}", e)))?;

        // Misconfiguration is reported by a separate configuration probe.
        let config_url = self.url(&format!("/v6/domains/{}/config", domain));
        let config_response = self
            .http_client
            .get(&config_url)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| {
                AppError::EdgeProvider(format!("Failed to fetch domain config: {}", e))
            })?;

        if !config_response.status().is_success() {
            let (status, _, message) = Self::error_message(config_response).await;
            return Err(AppError::EdgeProvider(format!(
                "Failed to fetch domain config for '{}': {} - {}",
                domain, status, message
            )));
        }

        let domain_config: DomainConfig = config_response.json().await.map_err(|e| {
            AppError::EdgeProvider(format!("Failed to parse domain config: {}", e))
        })?;

        Ok(DomainVerification {
            verified: project_domain.verified,
            misconfigured: domain_config.misconfigured,
        })
    }

    async fn detach_domain(&self, domain: &str) -> Result<()> {
        let url = self.url(&format!(
            "/v9/projects/{}/domains/{}",
            self.config.project_id, domain
        ));

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await
            .map_err(|e| AppError::EdgeProvider(format!("Failed to detach domain: {}", e)))?;

        // Already gone counts as detached.
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }

        let (status, _, message) = Self::error_message(response).await;
        Err(AppError::EdgeProvider(format!(
            "Failed to detach domain '{}': {} - {}",
            domain, status, message
        )))
    }
}
