pub mod billing_event_repository;
pub mod minimax_provider;
pub mod polly_provider;
pub mod quota_repository;
pub mod reset_token_repository;
pub mod speech_provider;
pub mod subscription_repository;
pub mod user_repository;
pub mod verification_token_repository;

pub use billing_event_repository::BillingEventRepository;
pub use minimax_provider::MinimaxProvider;
pub use polly_provider::PollyProvider;
pub use quota_repository::QuotaRepository;
pub use reset_token_repository::{ResetToken, ResetTokenRepository};
pub use speech_provider::{ProviderError, SpeechProvider};
pub use subscription_repository::SubscriptionRepository;
pub use user_repository::UserRepository;
pub use verification_token_repository::{VerificationToken, VerificationTokenRepository};
