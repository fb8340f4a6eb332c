//! Tenant (store) domain model and custom-domain state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Sentinel tenant id served for the fixed demo hostname. It bypasses the
/// store and the cache entirely.
pub const DEMO_TENANT_ID: &str = "demo";

/// Lifecycle state of a tenant's custom domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DomainStatus {
    #[default]
    Unverified,
    PendingDns,
    Connected,
    Misconfigured,
}

impl std::str::FromStr for DomainStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unverified" => Ok(DomainStatus::Unverified),
            "pending_dns" => Ok(DomainStatus::PendingDns),
            "connected" => Ok(DomainStatus::Connected),
            "misconfigured" => Ok(DomainStatus::Misconfigured),
            _ => Err(format!("Unknown domain status: {}", s)),
        }
    }
}

impl std::fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainStatus::Unverified => write!(f, "unverified"),
            DomainStatus::PendingDns => write!(f, "pending_dns"),
            DomainStatus::Connected => write!(f, "connected"),
            DomainStatus::Misconfigured => write!(f, "misconfigured"),
        }
    }
}

/// DNS record type a tenant must publish for their custom domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DnsRecordType {
    A,
    #[serde(rename = "CNAME")]
    Cname,
}

/// The DNS record a tenant must publish. Derived from the domain shape and
/// platform configuration; never user-editable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecord {
    #[serde(rename = "type")]
    pub record_type: DnsRecordType,
    pub name: String,
    pub value: String,
}

/// Raw verification flags reported by the edge network for a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainVerification {
    pub verified: bool,
    pub misconfigured: bool,
}

impl DomainVerification {
    /// Classify provider flags into a lifecycle state.
    ///
    /// `connected` iff verified and not misconfigured; `misconfigured`
    /// whenever the provider flags a misconfiguration; `pending_dns`
    /// otherwise.
    pub fn classify(&self) -> DomainStatus {
        if self.misconfigured {
            DomainStatus::Misconfigured
        } else if self.verified {
            DomainStatus::Connected
        } else {
            DomainStatus::PendingDns
        }
    }
}

/// Tenant entity (one storefront)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TenantRecord {
    /// Owner-assigned stable identifier
    pub id: String,
    pub name: String,
    /// Human-readable alias used under the shared root domain
    pub slug: Option<String>,
    /// Fully-qualified custom domain, lowercase
    pub custom_domain: Option<String>,
    pub domain_status: DomainStatus,
    pub dns_record: Option<sqlx::types::Json<DnsRecord>>,
    pub domain_verified: bool,
    pub domain_misconfigured: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub owner_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for TenantRecord {
    fn default() -> Self {
        Self {
            id: "store-1".to_string(),
            name: "Store".to_string(),
            slug: None,
            custom_domain: None,
            domain_status: DomainStatus::Unverified,
            dns_record: None,
            domain_verified: false,
            domain_misconfigured: false,
            last_synced_at: None,
            owner_email: "owner@example.com".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

impl TenantRecord {
    /// `connected` must never be claimed without a custom domain attached.
    pub fn invariants_hold(&self) -> bool {
        self.domain_status != DomainStatus::Connected || self.custom_domain.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_connected() {
        let v = DomainVerification {
            verified: true,
            misconfigured: false,
        };
        assert_eq!(v.classify(), DomainStatus::Connected);
    }

    #[test]
    fn test_classify_misconfigured_wins() {
        // A domain can report verified and misconfigured at once; the
        // misconfiguration flag takes precedence.
        let v = DomainVerification {
            verified: true,
            misconfigured: true,
        };
        assert_eq!(v.classify(), DomainStatus::Misconfigured);
    }

    #[test]
    fn test_classify_pending() {
        let v = DomainVerification {
            verified: false,
            misconfigured: false,
        };
        assert_eq!(v.classify(), DomainStatus::PendingDns);
    }

    #[test]
    fn test_domain_status_roundtrip() {
        for status in [
            DomainStatus::Unverified,
            DomainStatus::PendingDns,
            DomainStatus::Connected,
            DomainStatus::Misconfigured,
        ] {
            let parsed: DomainStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_dns_record_serializes_camel_case() {
        let record = DnsRecord {
            record_type: DnsRecordType::Cname,
            name: "shop".to_string(),
            value: "cname.vercel-dns.com".to_string(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""type":"CNAME""#));
        assert!(json.contains(r#""name":"shop""#));
    }

    #[test]
    fn test_connected_without_domain_violates_invariant() {
        let record = TenantRecord {
            domain_status: DomainStatus::Connected,
            custom_domain: None,
            ..Default::default()
        };
        assert!(!record.invariants_hold());
    }
}
