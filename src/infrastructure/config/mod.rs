use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub aws_region: String,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Base URL used to build verification / reset links and checkout redirects
    pub app_base_url: String,
    // Stripe
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_yearly_price_id: String,
    pub stripe_monthly_price_id: String,
    pub stripe_10k_price_id: String,
    pub stripe_1m_price_id: String,
    pub stripe_3m_price_id: String,
    // Minimax
    pub minimax_api_key: String,
    pub minimax_group_id: String,
    // Email
    pub email_from: String,
    pub smtp: Option<SmtpConfig>,
    // Audio cache
    pub audio_cache_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        // SMTP settings are optional as a group; without them the email
        // service falls back to the file transport.
        let smtp = match (
            env::var("SMTP_HOST"),
            env::var("SMTP_USERNAME"),
            env::var("SMTP_PASSWORD"),
        ) {
            (Ok(host), Ok(username), Ok(password)) => Some(SmtpConfig {
                host,
                port: env::var("SMTP_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse()?,
                username,
                password,
            }),
            _ => None,
        };

        let config = Config {
            database_url: env::var("DATABASE_URL")?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "production" => Environment::Production,
                    _ => Environment::Development,
                })?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })?,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").ok(),
            stripe_yearly_price_id: env::var("STRIPE_YEARLY_PRICE_ID")?,
            stripe_monthly_price_id: env::var("STRIPE_MONTHLY_PRICE_ID")?,
            stripe_10k_price_id: env::var("STRIPE_10K_PRICE_ID")?,
            stripe_1m_price_id: env::var("STRIPE_1M_PRICE_ID")?,
            stripe_3m_price_id: env::var("STRIPE_3M_PRICE_ID")?,
            minimax_api_key: env::var("MINIMAX_API_KEY")?,
            minimax_group_id: env::var("MINIMAX_GROUP_ID")?,
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "noreply@voicecanvas.com".to_string()),
            smtp,
            audio_cache_enabled: env::var("AUDIO_CACHE_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse::<String>()
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(false),
        };

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}
