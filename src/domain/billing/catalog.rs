use crate::domain::billing::model::PlanType;
use crate::error::{AppError, AppResult};
use crate::infrastructure::config::Config;

/// Days granted per subscription plan.
pub const YEARLY_DURATION_DAYS: i64 = 365;
pub const MONTHLY_DURATION_DAYS: i64 = 30;

/// Characters granted per plan.
pub const YEARLY_CHARACTERS: i64 = 1_500_000;
pub const MONTHLY_CHARACTERS: i64 = 100_000;

/// What a vendor price identifier buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricedPlan {
    Subscription {
        plan_type: PlanType,
        duration_days: i64,
        characters: i64,
    },
    OneTime {
        characters: i64,
    },
}

impl PricedPlan {
    pub fn characters(&self) -> i64 {
        match self {
            PricedPlan::Subscription { characters, .. } => *characters,
            PricedPlan::OneTime { characters } => *characters,
        }
    }
}

/// Purchasable plan kinds, as named by the checkout endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PurchasableKind {
    Yearly,
    Monthly,
    TenThousandChars,
    MillionChars,
    ThreeMillionChars,
}

impl PurchasableKind {
    pub fn is_subscription(&self) -> bool {
        matches!(self, PurchasableKind::Yearly | PurchasableKind::Monthly)
    }
}

/// Static mapping between the five configured Stripe price identifiers and
/// their plan descriptors.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    yearly_price_id: String,
    monthly_price_id: String,
    ten_k_price_id: String,
    one_m_price_id: String,
    three_m_price_id: String,
}

impl PlanCatalog {
    pub fn from_config(config: &Config) -> Self {
        Self {
            yearly_price_id: config.stripe_yearly_price_id.clone(),
            monthly_price_id: config.stripe_monthly_price_id.clone(),
            ten_k_price_id: config.stripe_10k_price_id.clone(),
            one_m_price_id: config.stripe_1m_price_id.clone(),
            three_m_price_id: config.stripe_3m_price_id.clone(),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            yearly_price_id: "price_yearly".to_string(),
            monthly_price_id: "price_monthly".to_string(),
            ten_k_price_id: "price_10k".to_string(),
            one_m_price_id: "price_1m".to_string(),
            three_m_price_id: "price_3m".to_string(),
        }
    }

    /// Resolve a vendor price identifier to a plan descriptor. An
    /// unrecognized identifier rejects the whole event.
    pub fn resolve(&self, price_id: &str) -> AppResult<PricedPlan> {
        if price_id == self.yearly_price_id {
            Ok(PricedPlan::Subscription {
                plan_type: PlanType::Yearly,
                duration_days: YEARLY_DURATION_DAYS,
                characters: YEARLY_CHARACTERS,
            })
        } else if price_id == self.monthly_price_id {
            Ok(PricedPlan::Subscription {
                plan_type: PlanType::Monthly,
                duration_days: MONTHLY_DURATION_DAYS,
                characters: MONTHLY_CHARACTERS,
            })
        } else if price_id == self.ten_k_price_id {
            Ok(PricedPlan::OneTime { characters: 10_000 })
        } else if price_id == self.one_m_price_id {
            Ok(PricedPlan::OneTime {
                characters: 1_000_000,
            })
        } else if price_id == self.three_m_price_id {
            Ok(PricedPlan::OneTime {
                characters: 3_000_000,
            })
        } else {
            Err(AppError::InvalidPriceId(price_id.to_string()))
        }
    }

    /// Reverse lookup used when creating checkout sessions.
    pub fn price_for(&self, kind: PurchasableKind) -> &str {
        match kind {
            PurchasableKind::Yearly => &self.yearly_price_id,
            PurchasableKind::Monthly => &self.monthly_price_id,
            PurchasableKind::TenThousandChars => &self.ten_k_price_id,
            PurchasableKind::MillionChars => &self.one_m_price_id,
            PurchasableKind::ThreeMillionChars => &self.three_m_price_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resolves_yearly_subscription() {
        let catalog = PlanCatalog::for_tests();
        let plan = catalog.resolve("price_yearly").unwrap();
        assert_eq!(
            plan,
            PricedPlan::Subscription {
                plan_type: PlanType::Yearly,
                duration_days: 365,
                characters: 1_500_000,
            }
        );
    }

    #[test]
    fn resolves_monthly_subscription() {
        let catalog = PlanCatalog::for_tests();
        let plan = catalog.resolve("price_monthly").unwrap();
        assert_eq!(
            plan,
            PricedPlan::Subscription {
                plan_type: PlanType::Monthly,
                duration_days: 30,
                characters: 100_000,
            }
        );
    }

    #[test]
    fn resolves_one_time_packs() {
        let catalog = PlanCatalog::for_tests();
        assert_eq!(
            catalog.resolve("price_10k").unwrap().characters(),
            10_000
        );
        assert_eq!(
            catalog.resolve("price_1m").unwrap().characters(),
            1_000_000
        );
        assert_eq!(
            catalog.resolve("price_3m").unwrap().characters(),
            3_000_000
        );
    }

    #[test]
    fn unknown_price_id_is_rejected() {
        let catalog = PlanCatalog::for_tests();
        let err = catalog.resolve("price_bogus").unwrap_err();
        assert!(matches!(err, AppError::InvalidPriceId(_)));
    }

    #[test]
    fn price_for_round_trips() {
        let catalog = PlanCatalog::for_tests();
        assert_eq!(catalog.price_for(PurchasableKind::Yearly), "price_yearly");
        assert_eq!(
            catalog.price_for(PurchasableKind::ThreeMillionChars),
            "price_3m"
        );
    }
}
