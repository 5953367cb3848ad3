use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::infrastructure::config::Config;

/// Outbound email delivery. Production uses SMTP; without SMTP settings the
/// file transport writes messages to ./emails for inspection.
pub struct EmailService {
    transport: EmailTransport,
    from_email: String,
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

impl EmailService {
    pub fn new(config: &Config) -> AppResult<Self> {
        let transport = match &config.smtp {
            Some(smtp) => {
                let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                    .map_err(|e| {
                        AppError::Internal(format!("Failed to create SMTP transport: {}", e))
                    })?
                    .port(smtp.port)
                    .credentials(Credentials::new(
                        smtp.username.clone(),
                        smtp.password.clone(),
                    ));
                EmailTransport::Smtp(builder.build())
            }
            None => {
                let emails_dir = Path::new("./emails");
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| {
                        AppError::Internal(format!("Failed to create emails directory: {}", e))
                    })?;
                }
                tracing::warn!("SMTP not configured, writing emails to ./emails");
                EmailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(emails_dir))
            }
        };

        Ok(Self {
            transport,
            from_email: config.email_from.clone(),
        })
    }

    pub async fn send_verification_email(
        &self,
        to_email: &str,
        name: Option<&str>,
        verification_url: &str,
    ) -> AppResult<()> {
        let body = verification_body(verification_url, name);
        self.send(to_email, "Verify Your VoiceCanvas Account", &body)
            .await
    }

    pub async fn send_password_reset_email(
        &self,
        to_email: &str,
        name: Option<&str>,
        reset_url: &str,
    ) -> AppResult<()> {
        let body = password_reset_body(reset_url, name);
        self.send(to_email, "Reset Your VoiceCanvas Password", &body)
            .await
    }

    async fn send(&self, to_email: &str, subject: &str, body: &str) -> AppResult<()> {
        let from = self
            .from_email
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;
        let to = to_email
            .parse::<Mailbox>()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient address: {}", e)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let result = match &self.transport {
            EmailTransport::Smtp(transport) => {
                transport.send(message).await.map(|_| ()).map_err(|e| e.to_string())
            }
            EmailTransport::File(transport) => {
                transport.send(message).await.map(|_| ()).map_err(|e| e.to_string())
            }
        };

        result.map_err(|e| AppError::ExternalService(format!("Email delivery failed: {}", e)))?;

        tracing::info!(to = to_email, subject = subject, "Email sent");
        Ok(())
    }
}

fn verification_body(verification_url: &str, name: Option<&str>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="border: 1px solid #eee; border-radius: 10px; padding: 20px;">
    <h1 style="text-align: center;">Verify Your Email Address</h1>
    <p>Dear {name},</p>
    <p>Thank you for registering with VoiceCanvas. Please click the button below to verify your email address:</p>
    <p style="text-align: center; margin: 30px 0;">
      <a href="{url}" style="display: inline-block; background-color: #4F46E5; color: white; text-decoration: none; padding: 10px 20px; border-radius: 5px; font-weight: bold;">Verify Email</a>
    </p>
    <p>Or, you can copy and paste the following link into your browser:</p>
    <p style="word-break: break-all; color: #4F46E5;">{url}</p>
    <p>This link will expire in 24 hours.</p>
    <p style="margin-top: 30px; font-size: 12px; color: #666; text-align: center;">If you didn't request this verification, please ignore this email.</p>
  </div>
</body>
</html>"#,
        name = name.unwrap_or("User"),
        url = verification_url,
    )
}

fn password_reset_body(reset_url: &str, name: Option<&str>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="border: 1px solid #eee; border-radius: 10px; padding: 20px;">
    <h1 style="text-align: center;">Reset Your Password</h1>
    <p>Dear {name},</p>
    <p>We received a request to reset your password. Click the button below to create a new password:</p>
    <p style="text-align: center; margin: 30px 0;">
      <a href="{url}" style="display: inline-block; background-color: #4F46E5; color: white; text-decoration: none; padding: 10px 20px; border-radius: 5px; font-weight: bold;">Reset Password</a>
    </p>
    <p>Or, you can copy and paste the following link into your browser:</p>
    <p style="word-break: break-all; color: #4F46E5;">{url}</p>
    <p>This link will expire in 1 hour for security reasons.</p>
    <p>If you did not request a password reset, please ignore this email or contact support if you have concerns.</p>
  </div>
</body>
</html>"#,
        name = name.unwrap_or("User"),
        url = reset_url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodies_embed_the_action_link() {
        let url = "https://app.example.com/verify-email?token=abc123";
        let body = verification_body(url, Some("Ana"));
        assert!(body.contains(url));
        assert!(body.contains("Dear Ana"));
        assert!(body.contains("24 hours"));

        let body = password_reset_body("https://app.example.com/reset-password?token=t", None);
        assert!(body.contains("Dear User"));
        assert!(body.contains("1 hour"));
    }
}
