pub mod dto;
pub mod jwt;
pub mod password;
pub mod service;

pub use dto::{
    ForgotPasswordRequest, MessageResponse, ResendVerificationRequest, ResetPasswordRequest,
    VerifyEmailQuery,
};
pub use jwt::{Claims, JwtManager};
pub use service::AuthService;
