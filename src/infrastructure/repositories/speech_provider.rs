use crate::domain::speech::LanguageTag;
use async_trait::async_trait;

/// Failure modes of an outbound synthesis call. Callers decide what is
/// retryable; nothing here is retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider call timed out")]
    Timeout,

    #[error("provider returned invalid data: {0}")]
    InvalidResponse(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Outbound TTS provider seam. Implementations own provider-specific voice
/// selection, request limits and audio merging, and return playable MP3
/// bytes.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        language: LanguageTag,
        female: bool,
        speed: f32,
    ) -> Result<Vec<u8>, ProviderError>;
}
