use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Subscription row. At most one per user; never deleted, the status field
/// transitions instead.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_type: PlanType,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "lowercase")]
pub enum PlanType {
    #[serde(rename = "trial")]
    Trial,
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "yearly")]
    Yearly,
}

impl std::fmt::Display for PlanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanType::Trial => write!(f, "trial"),
            PlanType::Monthly => write!(f, "monthly"),
            PlanType::Yearly => write!(f, "yearly"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "text")]
#[sqlx(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "canceled")]
    Canceled,
    #[serde(rename = "payment_failed")]
    PaymentFailed,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::Canceled => write!(f, "canceled"),
            SubscriptionStatus::PaymentFailed => write!(f, "payment_failed"),
        }
    }
}

impl Subscription {
    /// Active and not yet past its end date.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.end_date > now
    }
}

/// Character quota row. Permanent quota comes from one-time purchases and
/// never expires; temporary quota is granted by subscriptions and expires
/// with them; used_characters only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CharacterQuota {
    pub id: Uuid,
    pub user_id: Uuid,
    pub permanent_quota: i64,
    pub temporary_quota: i64,
    pub used_characters: i64,
    pub quota_expiry: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl CharacterQuota {
    /// Whether the temporary quota still counts at `now`. A missing expiry
    /// means the balance never lapses.
    pub fn temporary_active(&self, now: DateTime<Utc>) -> bool {
        match self.quota_expiry {
            Some(expiry) => expiry > now,
            None => true,
        }
    }

    /// Remaining balance, evaluated at read time. Can go negative when a
    /// temporary grant expired after being spent.
    pub fn remaining(&self, now: DateTime<Utc>) -> i64 {
        let temporary = if self.temporary_active(now) {
            self.temporary_quota
        } else {
            0
        };
        self.permanent_quota + temporary - self.used_characters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn quota(permanent: i64, temporary: i64, used: i64, expiry: Option<DateTime<Utc>>) -> CharacterQuota {
        CharacterQuota {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            permanent_quota: permanent,
            temporary_quota: temporary,
            used_characters: used,
            quota_expiry: expiry,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn remaining_ignores_expired_temporary_quota() {
        let now = Utc::now();
        let q = quota(100, 50, 120, Some(now - Duration::hours(1)));
        assert_eq!(q.remaining(now), -20);
    }

    #[test]
    fn remaining_counts_live_temporary_quota() {
        let now = Utc::now();
        let q = quota(100, 50, 120, Some(now + Duration::hours(1)));
        assert_eq!(q.remaining(now), 30);
    }

    #[test]
    fn remaining_treats_missing_expiry_as_live() {
        let now = Utc::now();
        let q = quota(0, 10_000, 2_500, None);
        assert_eq!(q.remaining(now), 7_500);
    }

    #[test]
    fn subscription_active_requires_future_end_date() {
        let now = Utc::now();
        let sub = Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan_type: PlanType::Monthly,
            start_date: now - Duration::days(40),
            end_date: now - Duration::days(10),
            status: SubscriptionStatus::Active,
            created_at: now,
            updated_at: now,
        };
        assert!(!sub.is_active(now));
    }
}
