use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    domain::billing::{PlanCatalog, PurchasableKind, ReconciliationService},
    error::{AppError, AppResult},
    infrastructure::auth::AuthUser,
    infrastructure::stripe::{CheckoutSessionParams, StripeGateway, WebhookDecoder},
};

/// Request for POST /api/billing/checkout
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub plan_type: PurchasableKind,
}

pub struct BillingController {
    reconciliation_service: Arc<ReconciliationService>,
    decoder: WebhookDecoder,
    stripe: Arc<dyn StripeGateway>,
    catalog: PlanCatalog,
    app_base_url: String,
}

impl BillingController {
    pub fn new(
        reconciliation_service: Arc<ReconciliationService>,
        decoder: WebhookDecoder,
        stripe: Arc<dyn StripeGateway>,
        catalog: PlanCatalog,
        app_base_url: String,
    ) -> Self {
        Self {
            reconciliation_service,
            decoder,
            stripe,
            catalog,
            app_base_url,
        }
    }

    /// POST /api/webhook/stripe - Vendor billing webhook. Signature is
    /// verified in production; processing failures return 500 so the vendor
    /// redelivers.
    pub async fn stripe_webhook(
        State(controller): State<Arc<BillingController>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let event = if controller.decoder.requires_signature() {
            let Some(signature) = headers
                .get("stripe-signature")
                .and_then(|v| v.to_str().ok())
            else {
                tracing::warn!("Missing Stripe-Signature header");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "Missing signature or endpoint secret" })),
                )
                    .into_response();
            };

            match controller.decoder.verify_and_parse(&body, signature) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "Webhook signature verification failed");
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error": "Webhook signature verification failed" })),
                    )
                        .into_response();
                }
            }
        } else {
            match controller.decoder.parse_unsigned(&body) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "Malformed webhook payload");
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({ "error": "Malformed webhook payload" })),
                    )
                        .into_response();
                }
            }
        };

        let event_id = event.id.clone();
        match controller.reconciliation_service.process(event).await {
            Ok(()) => Json(json!({ "received": true })).into_response(),
            Err(e) => {
                tracing::error!(event_id = %event_id, error = %e, "Webhook processing failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "Webhook processing failed",
                        "details": e.to_string()
                    })),
                )
                    .into_response()
            }
        }
    }

    /// POST /api/billing/checkout - Create a hosted checkout session
    pub async fn create_checkout_session(
        State(controller): State<Arc<BillingController>>,
        Extension(auth_user): Extension<AuthUser>,
        Json(request): Json<CheckoutRequest>,
    ) -> AppResult<Json<serde_json::Value>> {
        let price_id = controller.catalog.price_for(request.plan_type).to_string();
        let (mode, purchase_kind) = if request.plan_type.is_subscription() {
            ("subscription", "subscription")
        } else {
            ("payment", "quota")
        };

        let params = CheckoutSessionParams {
            price_id,
            mode,
            success_url: format!(
                "{}/profile?success=true&type={}",
                controller.app_base_url, purchase_kind
            ),
            cancel_url: format!("{}/pricing?canceled=true", controller.app_base_url),
            customer_email: Some(auth_user.email.clone()),
        };

        let session = controller
            .stripe
            .create_checkout_session(params)
            .await
            .map_err(AppError::from)?;

        Ok(Json(json!({ "sessionId": session.id })))
    }
}
