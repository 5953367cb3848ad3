pub mod client;
pub mod webhook;

pub use client::{CheckoutSessionParams, CreatedCheckoutSession, HttpStripeGateway, StripeGateway};
pub use webhook::{BillingEvent, BillingEventKind, WebhookDecoder};
