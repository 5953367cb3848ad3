use crate::error::AppResult;
use crate::infrastructure::db::DbPool;
use chrono::Utc;
use sqlx::PgConnection;
use std::sync::Arc;

/// Tracks vendor event ids already applied, so redelivered webhooks never
/// double-grant quota.
pub struct BillingEventRepository {
    #[allow(dead_code)]
    pool: Arc<DbPool>,
}

impl BillingEventRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Claim an event id inside the reconciliation transaction. Returns false
    /// when the event was already processed.
    pub async fn try_claim_in(
        &self,
        conn: &mut PgConnection,
        event_id: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO processed_billing_events (event_id, processed_at)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
