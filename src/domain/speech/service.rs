use super::dto::{SpeechRequest, SpeechVendor};
use super::error::SpeechError;
use super::gate::ConcurrencyGate;
use crate::infrastructure::repositories::{
    QuotaRepository, SpeechProvider, SubscriptionRepository,
};
use chrono::Utc;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Concurrency slots for anonymous callers
const ANONYMOUS_LIMIT: usize = 1;
/// Baseline slots for authenticated callers
const BASE_CONCURRENT_LIMIT: usize = 3;
/// Multiplier applied while a subscription is active
const VIP_MULTIPLIER: usize = 2;

/// Caller identity for the synthesis endpoint; derived from the session or
/// "anonymous" when there is none.
#[derive(Debug, Clone)]
pub enum SpeechIdentity {
    Anonymous,
    User { id: Uuid, email: String },
}

impl SpeechIdentity {
    pub fn gate_key(&self) -> &str {
        match self {
            SpeechIdentity::Anonymous => "anonymous",
            SpeechIdentity::User { email, .. } => email,
        }
    }
}

pub struct SpeechService {
    subscription_repo: Arc<SubscriptionRepository>,
    quota_repo: Arc<QuotaRepository>,
    polly: Arc<dyn SpeechProvider>,
    minimax: Arc<dyn SpeechProvider>,
    gate: ConcurrencyGate,
    cache: Option<Cache<String, Vec<u8>>>,
}

impl SpeechService {
    pub fn new(
        subscription_repo: Arc<SubscriptionRepository>,
        quota_repo: Arc<QuotaRepository>,
        polly: Arc<dyn SpeechProvider>,
        minimax: Arc<dyn SpeechProvider>,
        gate: ConcurrencyGate,
        cache_enabled: bool,
    ) -> Self {
        let cache = if cache_enabled {
            Some(
                Cache::builder()
                    .max_capacity(100)
                    .time_to_idle(Duration::from_secs(30 * 60)) // 30 minutes, refreshes on access
                    .build(),
            )
        } else {
            None
        };

        Self {
            subscription_repo,
            quota_repo,
            polly,
            minimax,
            gate,
            cache,
        }
    }

    /// Synthesize speech for the given identity. The concurrency gate is
    /// held for the duration of the provider call and released on every exit
    /// path via the permit guard.
    pub async fn synthesize(
        &self,
        identity: &SpeechIdentity,
        request: SpeechRequest,
    ) -> Result<Vec<u8>, SpeechError> {
        let char_count = request.text.chars().count() as i64;

        tracing::info!(
            identity = identity.gate_key(),
            provider = %request.provider,
            language = %request.language,
            text_length = request.text.len(),
            "Speech synthesis request"
        );

        // Minimax can only synthesize its supported language subset
        if request.provider == SpeechVendor::Minimax && !request.language.minimax_supported() {
            return Err(SpeechError::UnsupportedLanguage(format!(
                "Minimax cannot synthesize {}",
                request.language
            )));
        }

        let limit = self.concurrent_limit(identity).await?;
        let _permit = self.gate.acquire(identity.gate_key(), limit).await;

        let cache_key = cache_key(&request);
        if let Some(cache) = &self.cache {
            if let Some(audio) = cache.get(&cache_key).await {
                tracing::info!(
                    cached_audio_size = audio.len(),
                    "Audio cache hit - returning cached audio"
                );
                return Ok(audio);
            }
        }

        // Authenticated callers spend character quota
        if let SpeechIdentity::User { id, .. } = identity {
            self.guard_quota(*id, char_count).await?;
        }

        let provider: &dyn SpeechProvider = match request.provider {
            SpeechVendor::Aws => self.polly.as_ref(),
            SpeechVendor::Minimax => self.minimax.as_ref(),
        };

        let audio = provider
            .synthesize(
                &request.text,
                request.language,
                request.female,
                request.speed,
            )
            .await?;

        if let SpeechIdentity::User { id, .. } = identity {
            self.quota_repo
                .record_usage(*id, char_count)
                .await
                .map_err(|e| SpeechError::Dependency(e.to_string()))?;
        }

        if let Some(cache) = &self.cache {
            cache.insert(cache_key, audio.clone()).await;
        }

        Ok(audio)
    }

    /// One subscription read per acquire; the result is deliberately not
    /// cached so an expiring subscription takes effect immediately.
    async fn concurrent_limit(&self, identity: &SpeechIdentity) -> Result<usize, SpeechError> {
        match identity {
            SpeechIdentity::Anonymous => Ok(ANONYMOUS_LIMIT),
            SpeechIdentity::User { id, .. } => {
                let subscription = self
                    .subscription_repo
                    .find_by_user(*id)
                    .await
                    .map_err(|e| SpeechError::Dependency(e.to_string()))?;
                let vip = subscription
                    .map(|s| s.is_active(Utc::now()))
                    .unwrap_or(false);
                Ok(limit_for_user(vip))
            }
        }
    }

    async fn guard_quota(&self, user_id: Uuid, char_count: i64) -> Result<(), SpeechError> {
        let quota = self
            .quota_repo
            .find_by_user(user_id)
            .await
            .map_err(|e| SpeechError::Dependency(e.to_string()))?;

        // No quota row yet: the trial grant has not been materialized, so
        // nothing is deducted and nothing blocks.
        let Some(quota) = quota else {
            return Ok(());
        };

        let remaining = quota.remaining(Utc::now());
        if remaining < char_count {
            return Err(SpeechError::PaymentRequired(format!(
                "Character quota exhausted. Remaining: {}, Request: {}",
                remaining, char_count
            )));
        }

        Ok(())
    }
}

fn limit_for_user(active_subscription: bool) -> usize {
    if active_subscription {
        BASE_CONCURRENT_LIMIT * VIP_MULTIPLIER
    } else {
        BASE_CONCURRENT_LIMIT
    }
}

/// Cache key over every request field that affects the audio.
fn cache_key(request: &SpeechRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.text.as_bytes());
    format!(
        "{}:{}:{}:{}:{}",
        request.provider,
        request.language,
        request.female,
        request.speed,
        hex::encode(hasher.finalize())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::speech::LanguageTag;
    use pretty_assertions::assert_eq;

    #[test]
    fn anonymous_limit_is_one() {
        assert_eq!(ANONYMOUS_LIMIT, 1);
    }

    #[test]
    fn authenticated_limit_doubles_for_active_subscribers() {
        assert_eq!(limit_for_user(false), 3);
        assert_eq!(limit_for_user(true), 6);
    }

    #[test]
    fn cache_key_distinguishes_every_field() {
        let base = SpeechRequest {
            text: "Hello".to_string(),
            language: LanguageTag::EnUs,
            female: true,
            speed: 1.0,
            provider: SpeechVendor::Aws,
        };
        let other_text = SpeechRequest {
            text: "Goodbye".to_string(),
            ..request_like(&base)
        };
        let other_provider = SpeechRequest {
            provider: SpeechVendor::Minimax,
            ..request_like(&base)
        };
        let other_gender = SpeechRequest {
            female: false,
            ..request_like(&base)
        };

        let key = cache_key(&base);
        assert_eq!(key, cache_key(&request_like(&base)));
        assert_ne!(key, cache_key(&other_text));
        assert_ne!(key, cache_key(&other_provider));
        assert_ne!(key, cache_key(&other_gender));
    }

    fn request_like(base: &SpeechRequest) -> SpeechRequest {
        SpeechRequest {
            text: base.text.clone(),
            language: base.language,
            female: base.female,
            speed: base.speed,
            provider: base.provider,
        }
    }

    #[test]
    fn gate_key_for_anonymous_and_user() {
        assert_eq!(SpeechIdentity::Anonymous.gate_key(), "anonymous");
        let user = SpeechIdentity::User {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
        };
        assert_eq!(user.gate_key(), "user@example.com");
    }
}
