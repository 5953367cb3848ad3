use super::password;
use crate::domain::user::User;
use crate::error::{AppError, AppResult};
use crate::infrastructure::email::EmailService;
use crate::infrastructure::repositories::{
    ResetTokenRepository, UserRepository, VerificationTokenRepository,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Password reset links are valid for one hour
const RESET_EXPIRATION_HOURS: i64 = 1;
/// Verification links are valid for a day
const VERIFICATION_EXPIRATION_HOURS: i64 = 24;

const MIN_PASSWORD_LENGTH: usize = 6;

/// Single-use token flows: password reset and email verification. Both issue
/// an unguessable token, purge prior tokens for the owner, deliver a link by
/// email, and consume the token exactly once on verification.
pub struct AuthService {
    user_repo: Arc<UserRepository>,
    reset_token_repo: Arc<ResetTokenRepository>,
    verification_token_repo: Arc<VerificationTokenRepository>,
    email_service: Arc<EmailService>,
    app_base_url: String,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<UserRepository>,
        reset_token_repo: Arc<ResetTokenRepository>,
        verification_token_repo: Arc<VerificationTokenRepository>,
        email_service: Arc<EmailService>,
        app_base_url: String,
    ) -> Self {
        Self {
            user_repo,
            reset_token_repo,
            verification_token_repo,
            email_service,
            app_base_url,
        }
    }

    /// Issue a password reset token and email the link. Succeeds whether or
    /// not the email is registered, so the response never reveals which.
    pub async fn request_password_reset(&self, email: &str) -> AppResult<()> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            tracing::info!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = password::generate_token();
        let expires = Utc::now() + Duration::hours(RESET_EXPIRATION_HOURS);

        self.reset_token_repo.delete_for_user(user.id).await?;
        self.reset_token_repo.create(user.id, &token, expires).await?;

        let reset_url = format!(
            "{}/reset-password?token={}",
            self.app_base_url,
            urlencoding::encode(&token)
        );

        if let Err(e) = self
            .email_service
            .send_password_reset_email(&user.email, user.name.as_deref(), &reset_url)
            .await
        {
            // Delivery failure must not block the flow; keep the link
            // recoverable from the logs.
            tracing::warn!(
                error = %e,
                reset_url = %reset_url,
                "Password reset email delivery failed, link logged for manual recovery"
            );
        }

        Ok(())
    }

    /// Consume a reset token and overwrite the stored credential.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        if new_password.len() < MIN_PASSWORD_LENGTH {
            return Err(AppError::BadRequest(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        // Absent and already-consumed tokens are indistinguishable on purpose
        let record = self
            .reset_token_repo
            .find(token)
            .await?
            .ok_or(AppError::TokenNotFound)?;

        if record.expires < Utc::now() {
            self.reset_token_repo.delete(token).await?;
            return Err(AppError::TokenExpired);
        }

        let user = self
            .user_repo
            .find_by_id(record.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let password_hash = password::hash_password(new_password)?;
        self.user_repo.update_password(user.id, &password_hash).await?;
        self.reset_token_repo.delete(token).await?;

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }

    /// Issue a verification token for a user and email the link.
    pub async fn issue_verification(&self, user: &User) -> AppResult<()> {
        let token = password::generate_token();
        let expires = Utc::now() + Duration::hours(VERIFICATION_EXPIRATION_HOURS);

        self.verification_token_repo
            .delete_for_email(&user.email)
            .await?;
        self.verification_token_repo
            .create(&user.email, &token, expires)
            .await?;
        self.user_repo.mark_unverified(user.id).await?;

        let verification_url = format!(
            "{}/verify-email?token={}",
            self.app_base_url,
            urlencoding::encode(&token)
        );

        if let Err(e) = self
            .email_service
            .send_verification_email(&user.email, user.name.as_deref(), &verification_url)
            .await
        {
            tracing::warn!(
                error = %e,
                verification_url = %verification_url,
                "Verification email delivery failed, link logged for manual recovery"
            );
        }

        Ok(())
    }

    /// Consume a verification token and mark the owning user verified.
    /// Verifying an already-verified user succeeds idempotently.
    pub async fn verify_email(&self, token: &str) -> AppResult<()> {
        let record = self
            .verification_token_repo
            .find(token)
            .await?
            .ok_or(AppError::TokenNotFound)?;

        if record.expires < Utc::now() {
            self.verification_token_repo.delete(token).await?;
            return Err(AppError::TokenExpired);
        }

        let user = self
            .user_repo
            .find_by_email(&record.identifier)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if user.is_verified() {
            self.verification_token_repo.delete(token).await?;
            return Ok(());
        }

        self.user_repo.mark_verified(user.id).await?;
        self.verification_token_repo.delete(token).await?;

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(())
    }

    /// Reissue a verification email for an unverified account.
    pub async fn resend_verification(&self, email: &str) -> AppResult<()> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("No account for this email".to_string()))?;

        if user.is_verified() {
            return Err(AppError::BadRequest(
                "Email is already verified".to_string(),
            ));
        }

        self.issue_verification(&user).await
    }
}
