//! Hostname resolution API handler
//!
//! Exposes the same resolution pipeline the routing middleware uses, for
//! edge functions and support tooling that need an explicit answer.

use crate::error::Result;
use crate::state::HasServices;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub domain: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub store_id: String,
}

/// Resolve a hostname to the tenant it serves.
///
/// Unknown hostnames answer 404 and entitlement failures answer 403, so
/// callers can distinguish "no such store" from "plan does not allow it".
pub async fn resolve_domain<S: HasServices>(
    State(state): State<S>,
    Query(query): Query<ResolveQuery>,
) -> Result<impl IntoResponse> {
    let store_id = state.resolver().resolve(&query.domain).await?;
    Ok(Json(ResolveResponse { store_id }))
}
