use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, FromRow)]
pub struct ResetToken {
    pub id: Uuid,
    pub token: String,
    pub user_id: Uuid,
    pub expires: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

pub struct ResetTokenRepository {
    pool: Arc<DbPool>,
}

impl ResetTokenRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Store a new reset token; all prior tokens for the user must already be
    /// purged by the caller.
    pub async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires: DateTime<Utc>,
    ) -> AppResult<()> {
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            INSERT INTO reset_tokens (id, token, user_id, expires, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(token)
        .bind(user_id)
        .bind(expires)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Look up a token by its opaque value
    pub async fn find(&self, token: &str) -> AppResult<Option<ResetToken>> {
        let pool = self.pool.as_ref();
        let record = sqlx::query_as::<_, ResetToken>(
            "SELECT * FROM reset_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(record)
    }

    /// Delete a single token (on consumption or detected expiry)
    pub async fn delete(&self, token: &str) -> AppResult<()> {
        let pool = self.pool.as_ref();
        sqlx::query("DELETE FROM reset_tokens WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Purge every token belonging to a user before issuing a new one
    pub async fn delete_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let pool = self.pool.as_ref();
        let result = sqlx::query("DELETE FROM reset_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
