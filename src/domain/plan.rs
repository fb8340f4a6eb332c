//! Owner plan tiers and entitlements

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Plan tier an owner is subscribed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Starter,
    Pro,
    Scale,
}

impl PlanTier {
    /// Whether the tier grants branded (custom-domain and slug) routing.
    pub fn allows_custom_domains(&self) -> bool {
        matches!(self, PlanTier::Pro | PlanTier::Scale)
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanTier::Free => write!(f, "free"),
            PlanTier::Starter => write!(f, "starter"),
            PlanTier::Pro => write!(f, "pro"),
            PlanTier::Scale => write!(f, "scale"),
        }
    }
}

/// Profile of a store owner, keyed by email
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OwnerProfile {
    pub email: String,
    pub plan_tier: PlanTier,
    pub roles: sqlx::types::Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for OwnerProfile {
    fn default() -> Self {
        Self {
            email: "owner@example.com".to_string(),
            plan_tier: PlanTier::Free,
            roles: sqlx::types::Json(Vec::new()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

impl OwnerProfile {
    /// Branded routing is granted by the plan tier or the admin override role.
    pub fn can_use_custom_domains(&self) -> bool {
        self.plan_tier.allows_custom_domains() || self.roles.iter().any(|r| r == "admin")
    }
}
