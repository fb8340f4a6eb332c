//! Tenant (store) repository

use crate::domain::{DnsRecord, DomainStatus, TenantRecord};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

const SELECT_COLUMNS: &str = r#"
    SELECT id, name, slug, custom_domain, domain_status, dns_record,
           domain_verified, domain_misconfigured, last_synced_at,
           owner_email, created_at, updated_at
    FROM stores
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<TenantRecord>>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<TenantRecord>>;
    async fn find_by_custom_domain(&self, domain: &str) -> Result<Option<TenantRecord>>;
    async fn find_by_owner_email(&self, email: &str) -> Result<Option<TenantRecord>>;
    /// Persist a fresh registration: the domain, its derived DNS record, and
    /// the `pending_dns` status, in one atomic write.
    async fn set_domain_registration(
        &self,
        id: &str,
        domain: &str,
        dns_record: &DnsRecord,
    ) -> Result<TenantRecord>;
    /// Persist the outcome of a verification poll.
    async fn set_domain_verification(
        &self,
        id: &str,
        status: DomainStatus,
        verified: bool,
        misconfigured: bool,
    ) -> Result<TenantRecord>;
    /// Record that a poll happened without changing lifecycle state.
    async fn touch_domain_sync(&self, id: &str) -> Result<()>;
    /// Clear all domain fields, returning the record to `unverified`.
    async fn clear_domain(&self, id: &str) -> Result<TenantRecord>;
}

pub struct TenantRepositoryImpl {
    pool: MySqlPool,
}

impl TenantRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn reload(&self, id: &str) -> Result<TenantRecord> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Store {} not found", id)))
    }
}

#[async_trait]
impl TenantRepository for TenantRepositoryImpl {
    async fn find_by_id(&self, id: &str) -> Result<Option<TenantRecord>> {
        let record = sqlx::query_as::<_, TenantRecord>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<TenantRecord>> {
        let record =
            sqlx::query_as::<_, TenantRecord>(&format!("{} WHERE slug = ?", SELECT_COLUMNS))
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;

        Ok(record)
    }

    async fn find_by_custom_domain(&self, domain: &str) -> Result<Option<TenantRecord>> {
        let record = sqlx::query_as::<_, TenantRecord>(&format!(
            "{} WHERE custom_domain = ?",
            SELECT_COLUMNS
        ))
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_owner_email(&self, email: &str) -> Result<Option<TenantRecord>> {
        // Owners may have several stores; the oldest one is the routing target.
        let record = sqlx::query_as::<_, TenantRecord>(&format!(
            "{} WHERE owner_email = ? ORDER BY created_at ASC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn set_domain_registration(
        &self,
        id: &str,
        domain: &str,
        dns_record: &DnsRecord,
    ) -> Result<TenantRecord> {
        let dns_json =
            serde_json::to_string(dns_record).map_err(|e| AppError::Internal(e.into()))?;

        let result = sqlx::query(
            r#"
            UPDATE stores
            SET custom_domain = ?, domain_status = ?, dns_record = ?,
                domain_verified = FALSE, domain_misconfigured = FALSE,
                last_synced_at = NOW(), updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(domain)
        .bind(DomainStatus::PendingDns)
        .bind(&dns_json)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Store {} not found", id)));
        }

        self.reload(id).await
    }

    async fn set_domain_verification(
        &self,
        id: &str,
        status: DomainStatus,
        verified: bool,
        misconfigured: bool,
    ) -> Result<TenantRecord> {
        let result = sqlx::query(
            r#"
            UPDATE stores
            SET domain_status = ?, domain_verified = ?, domain_misconfigured = ?,
                last_synced_at = NOW(), updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(status)
        .bind(verified)
        .bind(misconfigured)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Store {} not found", id)));
        }

        self.reload(id).await
    }

    async fn touch_domain_sync(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE stores SET last_synced_at = NOW() WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_domain(&self, id: &str) -> Result<TenantRecord> {
        let result = sqlx::query(
            r#"
            UPDATE stores
            SET custom_domain = NULL, domain_status = ?, dns_record = NULL,
                domain_verified = FALSE, domain_misconfigured = FALSE,
                updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(DomainStatus::Unverified)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Store {} not found", id)));
        }

        self.reload(id).await
    }
}
