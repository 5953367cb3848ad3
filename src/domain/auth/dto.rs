use serde::{Deserialize, Serialize};

/// Request for POST /api/auth/forgot-password
#[derive(Debug, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Request for POST /api/auth/reset-password
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Query for GET /api/auth/verify-email
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: Option<String>,
}

/// Request for POST /api/auth/resend-verification
#[derive(Debug, Serialize, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
