use crate::domain::user::{User, UserStatus};
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use sqlx::PgConnection;
use std::sync::Arc;
use uuid::Uuid;

pub struct UserRepository {
    pool: Arc<DbPool>,
}

impl UserRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Find user by ID
    pub async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let pool = self.pool.as_ref();
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Find user by email
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let pool = self.pool.as_ref();
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    /// Find user by email inside a reconciliation transaction
    pub async fn find_by_email_in(
        &self,
        conn: &mut PgConnection,
        email: &str,
    ) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(user)
    }

    /// Overwrite the stored credential with a new hash
    pub async fn update_password(&self, user_id: Uuid, password_hash: &str) -> AppResult<()> {
        let pool = self.pool.as_ref();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(password_hash)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Mark a user's email address as verified and activate the account
    pub async fn mark_verified(&self, user_id: Uuid) -> AppResult<()> {
        let pool = self.pool.as_ref();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            UPDATE users
            SET email_verified = $1, status = $2, updated_at = $1
            WHERE id = $3
            "#,
        )
        .bind(now)
        .bind(UserStatus::Active)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Clear verification state before a fresh verification token is issued
    pub async fn mark_unverified(&self, user_id: Uuid) -> AppResult<()> {
        let pool = self.pool.as_ref();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            UPDATE users
            SET email_verified = NULL, status = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(UserStatus::Pending)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }
}
