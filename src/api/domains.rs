//! Domain lifecycle API handlers

use crate::api::{ApiResponse, MessageResponse};
use crate::domain::{DnsRecord, DomainStatus, TenantRecord};
use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request body for domain registration
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDomainRequest {
    #[validate(length(min = 4, max = 253, message = "domain must be 4-253 characters"))]
    pub domain: String,
    #[validate(length(min = 1, message = "tenantId is required"))]
    pub tenant_id: String,
}

/// Request body for domain disconnection
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectDomainRequest {
    #[validate(length(min = 1, message = "tenantId is required"))]
    pub tenant_id: String,
}

/// Query parameters for status checks
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub tenant_id: String,
}

/// Domain state payload returned after registration
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStateBody {
    pub custom_domain: Option<String>,
    pub domain_status: DomainStatus,
    pub dns_record: Option<DnsRecord>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl From<TenantRecord> for DomainStateBody {
    fn from(record: TenantRecord) -> Self {
        Self {
            custom_domain: record.custom_domain,
            domain_status: record.domain_status,
            dns_record: record.dns_record.map(|json| json.0),
            last_synced_at: record.last_synced_at,
        }
    }
}

/// Verification status payload
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatusResponse {
    pub success: bool,
    pub status: DomainStatus,
    pub vercel_verified: bool,
    pub vercel_misconfigured: bool,
}

/// Register a custom domain for a tenant
pub async fn register_domain<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<RegisterDomainRequest>,
) -> Result<impl IntoResponse> {
    input.validate()?;

    let record = state
        .domain_service()
        .register(&input.tenant_id, &input.domain)
        .await?;

    Ok(Json(ApiResponse::new(
        "Domain registered; publish the DNS record to finish setup",
        DomainStateBody::from(record),
    )))
}

/// Check verification progress for a tenant's custom domain
pub async fn check_domain_status<S: HasServices>(
    State(state): State<S>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse> {
    let record = state.domain_service().check_status(&query.tenant_id).await?;

    Ok(Json(DomainStatusResponse {
        success: true,
        status: record.domain_status,
        vercel_verified: record.domain_verified,
        vercel_misconfigured: record.domain_misconfigured,
    }))
}

/// Disconnect a tenant's custom domain
pub async fn disconnect_domain<S: HasServices>(
    State(state): State<S>,
    Json(input): Json<DisconnectDomainRequest>,
) -> Result<impl IntoResponse> {
    input.validate()?;

    state.domain_service().disconnect(&input.tenant_id).await?;

    Ok(Json(MessageResponse::new("Domain disconnected")))
}
