use super::catalog::{PlanCatalog, PricedPlan};
use super::error::BillingError;
use super::model::{CharacterQuota, PlanType, Subscription, SubscriptionStatus};
use crate::infrastructure::db::DbPool;
use crate::infrastructure::repositories::{
    BillingEventRepository, QuotaRepository, SubscriptionRepository, UserRepository,
};
use crate::infrastructure::stripe::{BillingEvent, BillingEventKind, StripeGateway};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Consumes vendor billing events and merges them into stored
/// subscription/quota state. Every event is applied inside a single database
/// transaction keyed by the vendor event id, so redelivered events are
/// acknowledged without granting twice.
pub struct ReconciliationService {
    pool: Arc<DbPool>,
    catalog: PlanCatalog,
    stripe: Arc<dyn StripeGateway>,
    user_repo: Arc<UserRepository>,
    subscription_repo: Arc<SubscriptionRepository>,
    quota_repo: Arc<QuotaRepository>,
    billing_event_repo: Arc<BillingEventRepository>,
}

impl ReconciliationService {
    pub fn new(
        pool: Arc<DbPool>,
        catalog: PlanCatalog,
        stripe: Arc<dyn StripeGateway>,
        user_repo: Arc<UserRepository>,
        subscription_repo: Arc<SubscriptionRepository>,
        quota_repo: Arc<QuotaRepository>,
        billing_event_repo: Arc<BillingEventRepository>,
    ) -> Self {
        Self {
            pool,
            catalog,
            stripe,
            user_repo,
            subscription_repo,
            quota_repo,
            billing_event_repo,
        }
    }

    pub async fn process(&self, event: BillingEvent) -> Result<(), BillingError> {
        match event.kind {
            BillingEventKind::CheckoutCompleted {
                ref session_id,
                ref customer_email,
            } => {
                let email = customer_email
                    .clone()
                    .ok_or_else(|| BillingError::Webhook("Missing customer email".to_string()))?;
                let price_id = self
                    .stripe
                    .session_price_id(session_id)
                    .await?
                    .ok_or_else(|| BillingError::Webhook("Missing price id".to_string()))?;
                let plan = self.catalog.resolve(&price_id)?;

                tracing::info!(
                    event_id = %event.id,
                    email = %email,
                    price_id = %price_id,
                    "Applying checkout completion"
                );

                self.apply_purchase(&event.id, &email, plan).await
            }

            BillingEventKind::InvoicePaymentSucceeded {
                ref customer_id,
                ref subscription_id,
            } => {
                // Only subscription renewals carry a quota grant
                let Some(subscription_id) = subscription_id else {
                    tracing::debug!(event_id = %event.id, "Invoice without subscription, ignoring");
                    return Ok(());
                };
                let email = self.resolve_customer_email(customer_id).await?;
                let Some(price_id) = self.stripe.subscription_price_id(subscription_id).await?
                else {
                    tracing::debug!(event_id = %event.id, "Subscription without price, ignoring");
                    return Ok(());
                };
                let plan = self.catalog.resolve(&price_id)?;
                if !matches!(plan, PricedPlan::Subscription { .. }) {
                    return Err(BillingError::Webhook(
                        "Invoice renewal on a one-time price".to_string(),
                    ));
                }

                tracing::info!(
                    event_id = %event.id,
                    email = %email,
                    price_id = %price_id,
                    "Applying subscription renewal"
                );

                self.apply_purchase(&event.id, &email, plan).await
            }

            BillingEventKind::SubscriptionUpdated {
                ref customer_id,
                ref status,
                current_period_end,
            } => {
                let email = self.resolve_customer_email(customer_id).await?;
                let mapped = map_vendor_status(status);
                let end_date = current_period_end.unwrap_or_else(Utc::now);
                self.apply_vendor_state(&event.id, &email, mapped, Some(end_date))
                    .await
            }

            BillingEventKind::SubscriptionDeleted { ref customer_id } => {
                let email = self.resolve_customer_email(customer_id).await?;
                self.apply_vendor_state(&event.id, &email, SubscriptionStatus::Canceled, None)
                    .await
            }

            BillingEventKind::InvoicePaymentFailed { ref customer_id } => {
                let email = self.resolve_customer_email(customer_id).await?;
                self.apply_vendor_state(
                    &event.id,
                    &email,
                    SubscriptionStatus::PaymentFailed,
                    None,
                )
                .await
            }

            BillingEventKind::Ignored { ref event_type } => {
                tracing::debug!(event_id = %event.id, event_type = %event_type, "Ignoring event");
                Ok(())
            }
        }
    }

    async fn resolve_customer_email(&self, customer_id: &str) -> Result<String, BillingError> {
        self.stripe
            .customer_email(customer_id)
            .await?
            .ok_or_else(|| BillingError::Webhook("Missing customer email".to_string()))
    }

    /// Apply a subscription grant or one-time purchase in one transaction.
    async fn apply_purchase(
        &self,
        event_id: &str,
        email: &str,
        plan: PricedPlan,
    ) -> Result<(), BillingError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if !self
            .billing_event_repo
            .try_claim_in(&mut tx, event_id)
            .await?
        {
            tracing::info!(event_id = %event_id, "Event already processed, acknowledging");
            tx.commit().await?;
            return Ok(());
        }

        let user = self
            .user_repo
            .find_by_email_in(&mut tx, email)
            .await?
            .ok_or_else(|| BillingError::UserNotFound(email.to_string()))?;

        match plan {
            PricedPlan::Subscription {
                plan_type,
                duration_days,
                characters,
            } => {
                let existing = self
                    .subscription_repo
                    .find_by_user_in(&mut tx, user.id)
                    .await?;
                let (merged_plan, new_end) =
                    merge_subscription(existing.as_ref(), plan_type, duration_days, now);

                self.subscription_repo
                    .upsert_in(
                        &mut tx,
                        user.id,
                        merged_plan,
                        new_end,
                        SubscriptionStatus::Active,
                    )
                    .await?;

                let quota = self.quota_repo.find_by_user_in(&mut tx, user.id).await?;
                match merge_quota(quota.as_ref(), characters, new_end, now) {
                    QuotaMerge::Accrue { characters, expiry } => {
                        self.quota_repo
                            .accrue_temporary_in(&mut tx, user.id, characters, expiry)
                            .await?;
                    }
                    QuotaMerge::Replace { characters, expiry } => {
                        self.quota_repo
                            .replace_temporary_in(&mut tx, user.id, characters, expiry)
                            .await?;
                    }
                }

                tracing::info!(
                    user_id = %user.id,
                    plan_type = %merged_plan,
                    end_date = %new_end,
                    characters = characters,
                    "Subscription grant applied"
                );
            }
            PricedPlan::OneTime { characters } => {
                self.quota_repo
                    .add_permanent_in(&mut tx, user.id, characters)
                    .await?;

                tracing::info!(
                    user_id = %user.id,
                    characters = characters,
                    "Permanent quota purchase applied"
                );
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Write vendor-reported subscription state verbatim (no accrual).
    async fn apply_vendor_state(
        &self,
        event_id: &str,
        email: &str,
        status: SubscriptionStatus,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<(), BillingError> {
        let mut tx = self.pool.begin().await?;

        if !self
            .billing_event_repo
            .try_claim_in(&mut tx, event_id)
            .await?
        {
            tracing::info!(event_id = %event_id, "Event already processed, acknowledging");
            tx.commit().await?;
            return Ok(());
        }

        let user = self
            .user_repo
            .find_by_email_in(&mut tx, email)
            .await?
            .ok_or_else(|| BillingError::UserNotFound(email.to_string()))?;

        let updated = match end_date {
            Some(end_date) => {
                self.subscription_repo
                    .update_status_and_end_in(&mut tx, user.id, status, end_date)
                    .await?
            }
            None => {
                self.subscription_repo
                    .update_status_in(&mut tx, user.id, status)
                    .await?
            }
        };

        if !updated {
            return Err(BillingError::Webhook(format!(
                "No subscription on file for {}",
                email
            )));
        }

        tracing::info!(
            user_id = %user.id,
            status = %status,
            "Vendor subscription state applied"
        );

        tx.commit().await?;
        Ok(())
    }
}

/// Merge an incoming subscription grant with any existing subscription.
///
/// Plan-tier precedence: an active yearly plan is never downgraded by a
/// monthly renewal. Time accrual: remaining whole days of an active
/// subscription are added to the new grant's duration.
pub(crate) fn merge_subscription(
    existing: Option<&Subscription>,
    incoming: PlanType,
    duration_days: i64,
    now: DateTime<Utc>,
) -> (PlanType, DateTime<Utc>) {
    let mut plan_type = incoming;
    if let Some(sub) = existing {
        if sub.status == SubscriptionStatus::Active
            && sub.plan_type == PlanType::Yearly
            && incoming == PlanType::Monthly
        {
            plan_type = PlanType::Yearly;
        }
    }

    let mut end_date = now + Duration::days(duration_days);
    if let Some(sub) = existing {
        if sub.status == SubscriptionStatus::Active && sub.end_date > now {
            let remaining = sub.end_date - now;
            // Whole days remaining, rounded up
            let remaining_days = (remaining.num_seconds() + 86_399) / 86_400;
            end_date = now + Duration::days(remaining_days + duration_days);
        }
    }

    (plan_type, end_date)
}

/// How a subscription's character grant lands on the quota row.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum QuotaMerge {
    /// Existing temporary balance is still live: add to it and move the
    /// expiry out (used characters are kept).
    Accrue {
        characters: i64,
        expiry: DateTime<Utc>,
    },
    /// No live temporary balance: discard any expired remainder and start
    /// fresh.
    Replace {
        characters: i64,
        expiry: DateTime<Utc>,
    },
}

pub(crate) fn merge_quota(
    existing: Option<&CharacterQuota>,
    characters: i64,
    new_end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> QuotaMerge {
    let live = existing
        .and_then(|q| q.quota_expiry)
        .map(|expiry| expiry > now)
        .unwrap_or(false);

    if live {
        QuotaMerge::Accrue {
            characters,
            expiry: new_end,
        }
    } else {
        QuotaMerge::Replace {
            characters,
            expiry: new_end,
        }
    }
}

/// Map a vendor-reported subscription status onto the stored status set.
/// Unknown strings fall back to active, mirroring the original handler.
pub(crate) fn map_vendor_status(status: &str) -> SubscriptionStatus {
    match status {
        "canceled" => SubscriptionStatus::Canceled,
        "past_due" | "unpaid" | "incomplete" | "incomplete_expired" => {
            SubscriptionStatus::PaymentFailed
        }
        _ => SubscriptionStatus::Active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn subscription(
        plan_type: PlanType,
        status: SubscriptionStatus,
        end_date: DateTime<Utc>,
    ) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan_type,
            start_date: now - Duration::days(1),
            end_date,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn quota(expiry: Option<DateTime<Utc>>) -> CharacterQuota {
        CharacterQuota {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            permanent_quota: 0,
            temporary_quota: 50_000,
            used_characters: 20_000,
            quota_expiry: expiry,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn first_grant_runs_from_now() {
        let now = Utc::now();
        let (plan, end) = merge_subscription(None, PlanType::Monthly, 30, now);
        assert_eq!(plan, PlanType::Monthly);
        assert_eq!(end, now + Duration::days(30));
    }

    #[test]
    fn back_to_back_monthly_grants_accumulate_to_sixty_days() {
        let now = Utc::now();
        let existing = subscription(
            PlanType::Monthly,
            SubscriptionStatus::Active,
            now + Duration::days(30),
        );
        let (plan, end) = merge_subscription(Some(&existing), PlanType::Monthly, 30, now);
        assert_eq!(plan, PlanType::Monthly);
        assert_eq!(end, now + Duration::days(60));
    }

    #[test]
    fn partial_remaining_days_round_up() {
        let now = Utc::now();
        let existing = subscription(
            PlanType::Monthly,
            SubscriptionStatus::Active,
            now + Duration::days(10) + Duration::hours(1),
        );
        let (_, end) = merge_subscription(Some(&existing), PlanType::Monthly, 30, now);
        assert_eq!(end, now + Duration::days(41));
    }

    #[test]
    fn yearly_plan_is_never_downgraded_by_monthly_renewal() {
        let now = Utc::now();
        let existing = subscription(
            PlanType::Yearly,
            SubscriptionStatus::Active,
            now + Duration::days(200),
        );
        let (plan, end) = merge_subscription(Some(&existing), PlanType::Monthly, 30, now);
        assert_eq!(plan, PlanType::Yearly);
        assert_eq!(end, now + Duration::days(230));
    }

    #[test]
    fn yearly_grant_on_monthly_plan_upgrades() {
        let now = Utc::now();
        let existing = subscription(
            PlanType::Monthly,
            SubscriptionStatus::Active,
            now + Duration::days(10),
        );
        let (plan, end) = merge_subscription(Some(&existing), PlanType::Yearly, 365, now);
        assert_eq!(plan, PlanType::Yearly);
        assert_eq!(end, now + Duration::days(375));
    }

    #[test]
    fn expired_subscription_does_not_accrue_time() {
        let now = Utc::now();
        let existing = subscription(
            PlanType::Monthly,
            SubscriptionStatus::Active,
            now - Duration::days(5),
        );
        let (_, end) = merge_subscription(Some(&existing), PlanType::Monthly, 30, now);
        assert_eq!(end, now + Duration::days(30));
    }

    #[test]
    fn canceled_subscription_does_not_accrue_time_or_tier() {
        let now = Utc::now();
        let existing = subscription(
            PlanType::Yearly,
            SubscriptionStatus::Canceled,
            now + Duration::days(100),
        );
        let (plan, end) = merge_subscription(Some(&existing), PlanType::Monthly, 30, now);
        assert_eq!(plan, PlanType::Monthly);
        assert_eq!(end, now + Duration::days(30));
    }

    #[test]
    fn live_temporary_quota_accrues() {
        let now = Utc::now();
        let new_end = now + Duration::days(30);
        let existing = quota(Some(now + Duration::days(3)));

        let merge = merge_quota(Some(&existing), 100_000, new_end, now);
        assert_eq!(
            merge,
            QuotaMerge::Accrue {
                characters: 100_000,
                expiry: new_end,
            }
        );
    }

    #[test]
    fn expired_temporary_quota_is_replaced() {
        let now = Utc::now();
        let new_end = now + Duration::days(30);
        let existing = quota(Some(now - Duration::days(1)));

        let merge = merge_quota(Some(&existing), 100_000, new_end, now);
        assert_eq!(
            merge,
            QuotaMerge::Replace {
                characters: 100_000,
                expiry: new_end,
            }
        );
    }

    #[test]
    fn missing_quota_row_is_replaced() {
        let now = Utc::now();
        let new_end = now + Duration::days(365);

        let merge = merge_quota(None, 1_500_000, new_end, now);
        assert_eq!(
            merge,
            QuotaMerge::Replace {
                characters: 1_500_000,
                expiry: new_end,
            }
        );
    }

    #[test]
    fn quota_without_expiry_is_replaced() {
        // A NULL expiry only happens on rows created by one-time purchases;
        // a subscription grant then starts a fresh temporary balance.
        let now = Utc::now();
        let new_end = now + Duration::days(30);
        let existing = quota(None);

        let merge = merge_quota(Some(&existing), 100_000, new_end, now);
        assert!(matches!(merge, QuotaMerge::Replace { .. }));
    }

    #[test]
    fn vendor_status_mapping() {
        assert_eq!(map_vendor_status("active"), SubscriptionStatus::Active);
        assert_eq!(map_vendor_status("trialing"), SubscriptionStatus::Active);
        assert_eq!(map_vendor_status("canceled"), SubscriptionStatus::Canceled);
        assert_eq!(
            map_vendor_status("past_due"),
            SubscriptionStatus::PaymentFailed
        );
        assert_eq!(
            map_vendor_status("unpaid"),
            SubscriptionStatus::PaymentFailed
        );
        // Unknown statuses fall back to active
        assert_eq!(map_vendor_status("paused"), SubscriptionStatus::Active);
    }
}
