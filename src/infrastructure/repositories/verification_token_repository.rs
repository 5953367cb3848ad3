use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::sync::Arc;

/// Verification tokens are keyed by email (the `identifier` column), a shape
/// inherited from the original account table layout.
#[derive(Debug, FromRow)]
pub struct VerificationToken {
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
}

pub struct VerificationTokenRepository {
    pool: Arc<DbPool>,
}

impl VerificationTokenRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        email: &str,
        token: &str,
        expires: DateTime<Utc>,
    ) -> AppResult<()> {
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            INSERT INTO verification_tokens (identifier, token, expires)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(email)
        .bind(token)
        .bind(expires)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn find(&self, token: &str) -> AppResult<Option<VerificationToken>> {
        let pool = self.pool.as_ref();
        let record = sqlx::query_as::<_, VerificationToken>(
            "SELECT * FROM verification_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    pub async fn delete(&self, token: &str) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query("DELETE FROM verification_tokens WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Purge every live token for an email before issuing a new one
    pub async fn delete_for_email(&self, email: &str) -> AppResult<u64> {
        let pool = self.pool.as_ref();
        let result = sqlx::query("DELETE FROM verification_tokens WHERE identifier = $1")
            .bind(email)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
