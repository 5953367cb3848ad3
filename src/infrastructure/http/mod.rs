use axum::{middleware, routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::infrastructure::config::Config;
use crate::infrastructure::db::DbPool;
use crate::{
    controllers::{
        auth::AuthController, billing::BillingController, health, speech::SpeechController,
        user::UserController,
    },
    infrastructure::auth::{auth_middleware, optional_auth_middleware, request_id_middleware},
};

use crate::infrastructure::repositories::UserRepository;

/// Build the application router with all routes configured
pub fn build_router(
    pool: Arc<DbPool>,
    config: Arc<Config>,
    user_repo: Arc<UserRepository>,
    auth_controller: Arc<AuthController>,
    billing_controller: Arc<BillingController>,
    speech_controller: Arc<SpeechController>,
    user_controller: Arc<UserController>,
) -> Router {
    // Billing webhook (public - authenticated by its signature)
    let webhook_routes = Router::new()
        .route("/api/webhook/stripe", post(BillingController::stripe_webhook))
        .with_state(billing_controller.clone());

    // Checkout session creation (needs auth)
    let checkout_routes = Router::new()
        .route(
            "/api/billing/checkout",
            post(BillingController::create_checkout_session),
        )
        .with_state(billing_controller.clone())
        .layer(middleware::from_fn_with_state(
            (user_repo.clone(), config.clone()),
            auth_middleware,
        ));

    // Speech synthesis (anonymous allowed, session picked up when present)
    let speech_routes = Router::new()
        .route("/api/speech", post(SpeechController::synthesize))
        .with_state(speech_controller.clone())
        .layer(middleware::from_fn_with_state(
            (user_repo.clone(), config.clone()),
            optional_auth_middleware,
        ));

    // User plan (needs auth)
    let user_routes = Router::new()
        .route("/api/user/plan", get(UserController::get_plan))
        .with_state(user_controller.clone())
        .layer(middleware::from_fn_with_state(
            (user_repo.clone(), config.clone()),
            auth_middleware,
        ));

    // Token flows (public - no auth required)
    let auth_routes = Router::new()
        .route(
            "/api/auth/forgot-password",
            post(AuthController::forgot_password),
        )
        .route(
            "/api/auth/reset-password",
            post(AuthController::reset_password),
        )
        .route("/api/auth/verify-email", get(AuthController::verify_email))
        .route(
            "/api/auth/resend-verification",
            post(AuthController::resend_verification),
        )
        .with_state(auth_controller.clone());

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(pool.clone())
        .merge(webhook_routes)
        .merge(checkout_routes)
        .merge(speech_routes)
        .merge(user_routes)
        .merge(auth_routes)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    pool: Arc<DbPool>,
    config: Arc<Config>,
    user_repo: Arc<UserRepository>,
    auth_controller: Arc<AuthController>,
    billing_controller: Arc<BillingController>,
    speech_controller: Arc<SpeechController>,
    user_controller: Arc<UserController>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(
        pool,
        config.clone(),
        user_repo,
        auth_controller,
        billing_controller,
        speech_controller,
        user_controller,
    );

    // Start server
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
