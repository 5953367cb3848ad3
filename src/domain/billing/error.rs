use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("webhook error: {0}")]
    Webhook(String),

    #[error("user not found for {0}")]
    UserNotFound(String),

    #[error("unknown price identifier: {0}")]
    InvalidPriceId(String),

    #[error("stripe api error: {0}")]
    Gateway(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::Webhook(msg) => AppError::BadRequest(msg),
            // Surfaced as a 500 so the vendor retries delivery.
            BillingError::UserNotFound(msg) => AppError::Internal(format!("user not found for {}", msg)),
            BillingError::InvalidPriceId(id) => AppError::InvalidPriceId(id),
            BillingError::Gateway(msg) => AppError::ExternalService(msg),
            BillingError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<AppError> for BillingError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::InvalidPriceId(id) => BillingError::InvalidPriceId(id),
            AppError::Database(e) => BillingError::Database(e),
            other => BillingError::Gateway(other.to_string()),
        }
    }
}
