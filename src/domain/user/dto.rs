use crate::domain::billing::{CharacterQuota, Subscription};
use serde::Serialize;

/// Response for GET /api/user/plan
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub subscription: Subscription,
    pub character_quota: CharacterQuota,
    /// Balance evaluated at read time; never stored
    pub remaining_characters: i64,
}
