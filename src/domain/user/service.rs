use super::dto::PlanResponse;
use crate::error::{AppError, AppResult};
use crate::infrastructure::repositories::{
    QuotaRepository, SubscriptionRepository, UserRepository,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub struct UserService {
    user_repo: Arc<UserRepository>,
    subscription_repo: Arc<SubscriptionRepository>,
    quota_repo: Arc<QuotaRepository>,
}

impl UserService {
    pub fn new(
        user_repo: Arc<UserRepository>,
        subscription_repo: Arc<SubscriptionRepository>,
        quota_repo: Arc<QuotaRepository>,
    ) -> Self {
        Self {
            user_repo,
            subscription_repo,
            quota_repo,
        }
    }

    /// Get the user's subscription and character quota, materializing the
    /// 7-day trial defaults on first access.
    pub async fn get_user_plan(&self, user_id: Uuid) -> AppResult<PlanResponse> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let quota = match self.quota_repo.find_by_user(user.id).await? {
            Some(quota) => quota,
            None => {
                tracing::info!(user_id = %user.id, "Creating default trial quota");
                self.quota_repo.create_trial(user.id).await?
            }
        };

        let subscription = match self.subscription_repo.find_by_user(user.id).await? {
            Some(subscription) => subscription,
            None => {
                tracing::info!(user_id = %user.id, "Creating default trial subscription");
                self.subscription_repo.create_trial(user.id).await?
            }
        };

        let remaining_characters = quota.remaining(Utc::now()).max(0);

        Ok(PlanResponse {
            subscription,
            character_quota: quota,
            remaining_characters,
        })
    }
}
