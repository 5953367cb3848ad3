use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::billing::BillingError;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Parameters for creating a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub price_id: String,
    /// "subscription" for recurring plans, "payment" for one-time packs.
    pub mode: &'static str,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedCheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// Vendor billing API seam. The reconciliation engine resolves customer and
/// line-item references through this trait so tests can substitute a double.
#[async_trait]
pub trait StripeGateway: Send + Sync {
    /// Email on the vendor customer record, if any.
    async fn customer_email(&self, customer_id: &str) -> Result<Option<String>, BillingError>;

    /// Price identifier of the first line item of a checkout session.
    async fn session_price_id(&self, session_id: &str) -> Result<Option<String>, BillingError>;

    /// Price identifier of the first item of a subscription.
    async fn subscription_price_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<String>, BillingError>;

    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> Result<CreatedCheckoutSession, BillingError>;
}

/// Stripe REST implementation.
pub struct HttpStripeGateway {
    secret_key: String,
    http_client: reqwest::Client,
}

impl HttpStripeGateway {
    pub fn new(secret_key: String) -> Self {
        Self {
            secret_key,
            http_client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, BillingError> {
        let response = self
            .http_client
            .get(format!("{}{}", STRIPE_API_BASE, path))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| BillingError::Gateway(format!("Stripe request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BillingError::Gateway(format!(
                "Stripe returned {}: {}",
                status, body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BillingError::Gateway(format!("Failed to parse Stripe response: {}", e)))
    }
}

#[async_trait]
impl StripeGateway for HttpStripeGateway {
    async fn customer_email(&self, customer_id: &str) -> Result<Option<String>, BillingError> {
        let customer: StripeCustomer = self
            .get_json(&format!("/customers/{}", customer_id))
            .await?;
        Ok(customer.email)
    }

    async fn session_price_id(&self, session_id: &str) -> Result<Option<String>, BillingError> {
        let items: LineItemList = self
            .get_json(&format!("/checkout/sessions/{}/line_items", session_id))
            .await?;
        Ok(items
            .data
            .into_iter()
            .next()
            .and_then(|item| item.price.map(|p| p.id)))
    }

    async fn subscription_price_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<String>, BillingError> {
        let subscription: StripeSubscription = self
            .get_json(&format!("/subscriptions/{}", subscription_id))
            .await?;
        Ok(subscription
            .items
            .data
            .into_iter()
            .next()
            .and_then(|item| item.price.map(|p| p.id)))
    }

    async fn create_checkout_session(
        &self,
        params: CheckoutSessionParams,
    ) -> Result<CreatedCheckoutSession, BillingError> {
        let mut form = vec![
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][price]".to_string(), params.price_id),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("mode".to_string(), params.mode.to_string()),
            ("success_url".to_string(), params.success_url),
            ("cancel_url".to_string(), params.cancel_url),
        ];
        if let Some(email) = params.customer_email {
            form.push(("customer_email".to_string(), email));
        }

        let response = self
            .http_client
            .post(format!("{}/checkout/sessions", STRIPE_API_BASE))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| BillingError::Gateway(format!("Stripe request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BillingError::Gateway(format!(
                "Checkout session creation failed ({}): {}",
                status, body
            )));
        }

        response
            .json::<CreatedCheckoutSession>()
            .await
            .map_err(|e| BillingError::Gateway(format!("Failed to parse Stripe response: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct StripeCustomer {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LineItemList {
    data: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
struct LineItem {
    price: Option<Price>,
}

#[derive(Debug, Deserialize)]
struct Price {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeSubscription {
    items: LineItemList,
}
