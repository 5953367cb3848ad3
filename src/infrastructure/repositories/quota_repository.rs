use crate::domain::billing::CharacterQuota;
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgConnection;
use std::sync::Arc;
use uuid::Uuid;

/// Characters granted with the 7-day trial.
pub const TRIAL_CHARACTERS: i64 = 10_000;
pub const TRIAL_DAYS: i64 = 7;

pub struct QuotaRepository {
    pool: Arc<DbPool>,
}

impl QuotaRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Find the quota row owned by a user
    pub async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<CharacterQuota>> {
        let pool = self.pool.as_ref();
        let quota = sqlx::query_as::<_, CharacterQuota>(
            "SELECT * FROM character_quotas WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(quota)
    }

    /// Find and row-lock the quota inside a reconciliation transaction
    pub async fn find_by_user_in(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> AppResult<Option<CharacterQuota>> {
        let quota = sqlx::query_as::<_, CharacterQuota>(
            "SELECT * FROM character_quotas WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(quota)
    }

    /// Add characters to a still-live temporary balance and move its expiry
    pub async fn accrue_temporary_in(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        characters: i64,
        quota_expiry: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE character_quotas
            SET temporary_quota = temporary_quota + $1,
                quota_expiry = $2,
                last_updated = $3
            WHERE user_id = $4
            "#,
        )
        .bind(characters)
        .bind(quota_expiry)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Replace the temporary balance (discarding any expired remainder) and
    /// set the new expiry; creates the row if absent.
    pub async fn replace_temporary_in(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        characters: i64,
        quota_expiry: DateTime<Utc>,
    ) -> AppResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO character_quotas (id, user_id, permanent_quota, temporary_quota, used_characters, quota_expiry, last_updated)
            VALUES ($1, $2, 0, $3, 0, $4, $5)
            ON CONFLICT (user_id)
            DO UPDATE SET
                temporary_quota = EXCLUDED.temporary_quota,
                quota_expiry = EXCLUDED.quota_expiry,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(characters)
        .bind(quota_expiry)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Add permanently purchased characters; creates the row if absent.
    pub async fn add_permanent_in(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        characters: i64,
    ) -> AppResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO character_quotas (id, user_id, permanent_quota, temporary_quota, used_characters, quota_expiry, last_updated)
            VALUES ($1, $2, $3, 0, 0, NULL, $4)
            ON CONFLICT (user_id)
            DO UPDATE SET
                permanent_quota = character_quotas.permanent_quota + $3,
                last_updated = EXCLUDED.last_updated
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(characters)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Create the default trial quota for users without one
    pub async fn create_trial(&self, user_id: Uuid) -> AppResult<CharacterQuota> {
        let pool = self.pool.as_ref();
        let now = Utc::now();

        let quota = sqlx::query_as::<_, CharacterQuota>(
            r#"
            INSERT INTO character_quotas (id, user_id, permanent_quota, temporary_quota, used_characters, quota_expiry, last_updated)
            VALUES ($1, $2, 0, $3, 0, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(TRIAL_CHARACTERS)
        .bind(now + Duration::days(TRIAL_DAYS))
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(quota)
    }

    /// Record synthesized characters against the quota
    pub async fn record_usage(&self, user_id: Uuid, characters: i64) -> AppResult<()> {
        let pool = self.pool.as_ref();

        sqlx::query(
            r#"
            UPDATE character_quotas
            SET used_characters = used_characters + $1,
                last_updated = $2
            WHERE user_id = $3
            "#,
        )
        .bind(characters)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }
}
