use crate::domain::billing::{PlanType, Subscription, SubscriptionStatus};
use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgConnection;
use std::sync::Arc;
use uuid::Uuid;

pub struct SubscriptionRepository {
    pool: Arc<DbPool>,
}

impl SubscriptionRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Find the subscription owned by a user
    pub async fn find_by_user(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        let pool = self.pool.as_ref();
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(subscription)
    }

    /// Find and row-lock the subscription inside a reconciliation transaction
    pub async fn find_by_user_in(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> AppResult<Option<Subscription>> {
        let subscription = sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(subscription)
    }

    /// Upsert the subscription keyed by user id. The start date is only set
    /// on first creation.
    pub async fn upsert_in(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        plan_type: PlanType,
        end_date: DateTime<Utc>,
        status: SubscriptionStatus,
    ) -> AppResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, user_id, plan_type, start_date, end_date, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $4, $4)
            ON CONFLICT (user_id)
            DO UPDATE SET
                plan_type = EXCLUDED.plan_type,
                end_date = EXCLUDED.end_date,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(plan_type)
        .bind(now)
        .bind(end_date)
        .bind(status)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Update only the status. Returns whether a row existed.
    pub async fn update_status_in(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        status: SubscriptionStatus,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $1, updated_at = $2
            WHERE user_id = $3
            "#,
        )
        .bind(status)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Apply the vendor-reported status and period end verbatim. Returns
    /// whether a row existed.
    pub async fn update_status_and_end_in(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        status: SubscriptionStatus,
        end_date: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $1, end_date = $2, updated_at = $3
            WHERE user_id = $4
            "#,
        )
        .bind(status)
        .bind(end_date)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Create the 7-day trial subscription for users without one
    pub async fn create_trial(&self, user_id: Uuid) -> AppResult<Subscription> {
        let pool = self.pool.as_ref();
        let now = Utc::now();

        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (id, user_id, plan_type, start_date, end_date, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $4, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(PlanType::Trial)
        .bind(now)
        .bind(now + Duration::days(7))
        .bind(SubscriptionStatus::Active)
        .fetch_one(pool)
        .await?;

        Ok(subscription)
    }
}
