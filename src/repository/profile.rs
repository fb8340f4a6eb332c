//! Owner profile repository

use crate::domain::OwnerProfile;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<OwnerProfile>>;
}

pub struct ProfileRepositoryImpl {
    pool: MySqlPool,
}

impl ProfileRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for ProfileRepositoryImpl {
    async fn find_by_email(&self, email: &str) -> Result<Option<OwnerProfile>> {
        let profile = sqlx::query_as::<_, OwnerProfile>(
            r#"
            SELECT email, plan_tier, roles, created_at, updated_at
            FROM profiles
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}
