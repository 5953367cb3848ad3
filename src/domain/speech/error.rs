use crate::error::AppError;
use crate::infrastructure::repositories::ProviderError;

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("{0} is not supported by this provider")]
    UnsupportedLanguage(String),

    #[error("payment required: {0}")]
    PaymentRequired(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("dependency error: {0}")]
    Dependency(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<SpeechError> for AppError {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::UnsupportedLanguage(msg) => AppError::UnsupportedLanguage(msg),
            SpeechError::PaymentRequired(msg) => AppError::PaymentRequired(msg),
            SpeechError::Invalid(msg) => AppError::BadRequest(msg),
            SpeechError::Provider(ProviderError::Timeout) => AppError::ProviderTimeout,
            SpeechError::Provider(ProviderError::InvalidResponse(msg)) => {
                AppError::ProviderResponseInvalid(msg)
            }
            SpeechError::Provider(ProviderError::Unavailable(msg)) => {
                AppError::ExternalService(msg)
            }
            SpeechError::Dependency(msg) => AppError::ExternalService(msg),
            SpeechError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}
