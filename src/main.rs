use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voicecanvas_backend::domain::billing::PlanCatalog;
use voicecanvas_backend::domain::speech::ConcurrencyGate;
use voicecanvas_backend::infrastructure::config::{Config, LogFormat};
use voicecanvas_backend::infrastructure::db::{check_connection, create_pool, run_migrations};
use voicecanvas_backend::infrastructure::http::start_http_server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;
    if !config.is_development() && config.stripe_webhook_secret.is_none() {
        return Err("STRIPE_WEBHOOK_SECRET is required in production".into());
    }

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting VoiceCanvas Backend on {}:{}",
        config.host,
        config.port
    );

    // Create database connection pool
    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    // Verify database connection and apply migrations
    check_connection(&pool).await?;
    run_migrations(&pool).await?;
    tracing::info!("Database connection verified");

    // Create AWS Polly client
    tracing::info!("Initializing AWS Polly client with region: {}", config.aws_region);

    let has_access_key = std::env::var("AWS_ACCESS_KEY_ID").is_ok();
    let has_secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").is_ok();
    if !has_access_key || !has_secret_key {
        tracing::warn!("AWS credentials not found in environment variables. Will attempt to use other credential providers (instance metadata, etc.)");
    }

    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.aws_region.clone()))
        .load()
        .await;

    let polly_client = aws_sdk_polly::Client::new(&aws_config);
    tracing::info!("AWS Polly client initialized successfully");

    let pool = Arc::new(pool);
    let config = Arc::new(config);
    let polly_client = Arc::new(polly_client);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Instantiate repositories (inject db pool)
    tracing::info!("Instantiating repositories...");
    let user_repo = Arc::new(voicecanvas_backend::infrastructure::repositories::UserRepository::new(pool.clone()));
    let subscription_repo = Arc::new(voicecanvas_backend::infrastructure::repositories::SubscriptionRepository::new(pool.clone()));
    let quota_repo = Arc::new(voicecanvas_backend::infrastructure::repositories::QuotaRepository::new(pool.clone()));
    let reset_token_repo = Arc::new(voicecanvas_backend::infrastructure::repositories::ResetTokenRepository::new(pool.clone()));
    let verification_token_repo = Arc::new(voicecanvas_backend::infrastructure::repositories::VerificationTokenRepository::new(pool.clone()));
    let billing_event_repo = Arc::new(voicecanvas_backend::infrastructure::repositories::BillingEventRepository::new(pool.clone()));

    // 2. Instantiate vendor clients and providers
    tracing::info!("Instantiating vendor clients...");
    let stripe_gateway: Arc<dyn voicecanvas_backend::infrastructure::stripe::StripeGateway> =
        Arc::new(voicecanvas_backend::infrastructure::stripe::HttpStripeGateway::new(
            config.stripe_secret_key.clone(),
        ));
    let polly_provider: Arc<dyn voicecanvas_backend::infrastructure::repositories::SpeechProvider> =
        Arc::new(voicecanvas_backend::infrastructure::repositories::PollyProvider::new(
            polly_client.clone(),
        ));
    let minimax_provider: Arc<dyn voicecanvas_backend::infrastructure::repositories::SpeechProvider> =
        Arc::new(voicecanvas_backend::infrastructure::repositories::MinimaxProvider::new(
            config.minimax_api_key.clone(),
            config.minimax_group_id.clone(),
        ));
    let email_service = Arc::new(voicecanvas_backend::infrastructure::email::EmailService::new(&config)?);
    let webhook_decoder = voicecanvas_backend::infrastructure::stripe::WebhookDecoder::new(
        if config.is_development() {
            None
        } else {
            config.stripe_webhook_secret.clone()
        },
    );

    // 3. Instantiate services (inject repositories and clients)
    tracing::info!("Instantiating services...");
    let catalog = PlanCatalog::from_config(&config);
    let gate = ConcurrencyGate::new();

    let auth_service = Arc::new(voicecanvas_backend::domain::auth::AuthService::new(
        user_repo.clone(),
        reset_token_repo.clone(),
        verification_token_repo.clone(),
        email_service.clone(),
        config.app_base_url.clone(),
    ));
    let reconciliation_service = Arc::new(voicecanvas_backend::domain::billing::ReconciliationService::new(
        pool.clone(),
        catalog.clone(),
        stripe_gateway.clone(),
        user_repo.clone(),
        subscription_repo.clone(),
        quota_repo.clone(),
        billing_event_repo.clone(),
    ));
    let speech_service = Arc::new(voicecanvas_backend::domain::speech::SpeechService::new(
        subscription_repo.clone(),
        quota_repo.clone(),
        polly_provider,
        minimax_provider,
        gate,
        config.audio_cache_enabled,
    ));
    let user_service = Arc::new(voicecanvas_backend::domain::user::UserService::new(
        user_repo.clone(),
        subscription_repo.clone(),
        quota_repo.clone(),
    ));

    // 4. Instantiate controllers (inject services)
    tracing::info!("Instantiating controllers...");
    let auth_controller = Arc::new(voicecanvas_backend::controllers::auth::AuthController::new(auth_service));
    let billing_controller = Arc::new(voicecanvas_backend::controllers::billing::BillingController::new(
        reconciliation_service,
        webhook_decoder,
        stripe_gateway,
        catalog,
        config.app_base_url.clone(),
    ));
    let speech_controller = Arc::new(voicecanvas_backend::controllers::speech::SpeechController::new(speech_service));
    let user_controller = Arc::new(voicecanvas_backend::controllers::user::UserController::new(user_service));

    // Start HTTP server with all routes
    start_http_server(pool, config, user_repo, auth_controller, billing_controller, speech_controller, user_controller).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "voicecanvas_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "voicecanvas_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
