use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::{
    domain::auth::{
        AuthService, ForgotPasswordRequest, MessageResponse, ResendVerificationRequest,
        ResetPasswordRequest, VerifyEmailQuery,
    },
    error::{AppError, AppResult},
};

pub struct AuthController {
    auth_service: Arc<AuthService>,
}

impl AuthController {
    pub fn new(auth_service: Arc<AuthService>) -> Self {
        Self { auth_service }
    }

    /// POST /api/auth/forgot-password - Issue a password reset token.
    /// The response is identical whether or not the email is registered.
    pub async fn forgot_password(
        State(controller): State<Arc<AuthController>>,
        Json(request): Json<ForgotPasswordRequest>,
    ) -> AppResult<Json<MessageResponse>> {
        validate_email(&request.email)?;

        controller
            .auth_service
            .request_password_reset(&request.email)
            .await?;

        Ok(Json(MessageResponse {
            message:
                "If this email is registered, you will receive instructions to reset your password."
                    .to_string(),
        }))
    }

    /// POST /api/auth/reset-password - Consume a reset token
    pub async fn reset_password(
        State(controller): State<Arc<AuthController>>,
        Json(request): Json<ResetPasswordRequest>,
    ) -> AppResult<Json<MessageResponse>> {
        controller
            .auth_service
            .reset_password(&request.token, &request.password)
            .await?;

        Ok(Json(MessageResponse {
            message: "Password has been reset successfully".to_string(),
        }))
    }

    /// GET /api/auth/verify-email?token=... - Consume a verification token
    pub async fn verify_email(
        State(controller): State<Arc<AuthController>>,
        Query(query): Query<VerifyEmailQuery>,
    ) -> AppResult<Json<serde_json::Value>> {
        let token = query
            .token
            .ok_or_else(|| AppError::BadRequest("Missing verification token".to_string()))?;

        controller.auth_service.verify_email(&token).await?;

        Ok(Json(json!({
            "success": true,
            "message": "Email verified successfully"
        })))
    }

    /// POST /api/auth/resend-verification - Reissue a verification email
    pub async fn resend_verification(
        State(controller): State<Arc<AuthController>>,
        Json(request): Json<ResendVerificationRequest>,
    ) -> AppResult<Json<MessageResponse>> {
        validate_email(&request.email)?;

        controller
            .auth_service
            .resend_verification(&request.email)
            .await?;

        Ok(Json(MessageResponse {
            message: "Verification email sent".to_string(),
        }))
    }
}

fn validate_email(email: &str) -> AppResult<()> {
    let valid = email.contains('@')
        && !email.starts_with('@')
        && !email.ends_with('@')
        && !email.contains(char::is_whitespace);
    if !valid {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user @example.com").is_err());
    }
}
