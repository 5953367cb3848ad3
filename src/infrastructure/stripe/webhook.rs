use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::domain::billing::BillingError;

/// Maximum accepted skew between the signature timestamp and now.
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// A billing event after signature verification and payload parsing. The
/// vendor event id travels with it so processing can be deduplicated.
#[derive(Debug, Clone)]
pub struct BillingEvent {
    pub id: String,
    pub kind: BillingEventKind,
}

#[derive(Debug, Clone)]
pub enum BillingEventKind {
    CheckoutCompleted {
        session_id: String,
        customer_email: Option<String>,
    },
    SubscriptionUpdated {
        customer_id: String,
        status: String,
        current_period_end: Option<DateTime<Utc>>,
    },
    SubscriptionDeleted {
        customer_id: String,
    },
    InvoicePaymentSucceeded {
        customer_id: String,
        subscription_id: Option<String>,
    },
    InvoicePaymentFailed {
        customer_id: String,
    },
    /// Event types we do not handle; acknowledged and dropped.
    Ignored {
        event_type: String,
    },
}

/// Verifies `Stripe-Signature` headers and parses event payloads into typed
/// billing events.
pub struct WebhookDecoder {
    webhook_secret: Option<String>,
}

impl WebhookDecoder {
    /// `webhook_secret` is required in production; without it (development)
    /// payloads are parsed unsigned.
    pub fn new(webhook_secret: Option<String>) -> Self {
        Self { webhook_secret }
    }

    pub fn requires_signature(&self) -> bool {
        self.webhook_secret.is_some()
    }

    /// Verify the signature header and parse the payload.
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<BillingEvent, BillingError> {
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or_else(|| BillingError::Webhook("Missing endpoint secret".to_string()))?;
        verify_signature(secret, payload, signature, Utc::now())?;
        parse_event(payload)
    }

    /// Parse without a signature (development only).
    pub fn parse_unsigned(&self, payload: &[u8]) -> Result<BillingEvent, BillingError> {
        parse_event(payload)
    }
}

/// Verify a `t=timestamp,v1=hex` signature over `timestamp.payload`.
fn verify_signature(
    secret: &str,
    payload: &[u8],
    signature: &str,
    now: DateTime<Utc>,
) -> Result<(), BillingError> {
    let mut timestamp: Option<&str> = None;
    let mut sig_v1: Option<&str> = None;

    for part in signature.split(',') {
        if let Some((key, value)) = part.split_once('=') {
            match key {
                "t" => timestamp = Some(value),
                "v1" => sig_v1 = Some(value),
                _ => {}
            }
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| BillingError::Webhook("Missing timestamp in signature".to_string()))?;
    let sig_v1 =
        sig_v1.ok_or_else(|| BillingError::Webhook("Missing v1 signature".to_string()))?;

    let body = std::str::from_utf8(payload)
        .map_err(|_| BillingError::Webhook("Invalid payload encoding".to_string()))?;
    let signed_payload = format!("{}.{}", timestamp, body);

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| BillingError::Webhook("HMAC init failed".to_string()))?;
    mac.update(signed_payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !constant_time_eq(sig_v1.as_bytes(), expected.as_bytes()) {
        return Err(BillingError::Webhook(
            "Signature verification failed".to_string(),
        ));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| BillingError::Webhook("Invalid timestamp format".to_string()))?;
    if (now.timestamp() - ts).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(BillingError::Webhook("Timestamp too old".to_string()));
    }

    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn parse_event(payload: &[u8]) -> Result<BillingEvent, BillingError> {
    let raw: RawEvent =
        serde_json::from_slice(payload).map_err(|e| BillingError::Webhook(e.to_string()))?;

    tracing::debug!(
        event_id = %raw.id,
        event_type = %raw.event_type,
        "Parsed billing webhook event"
    );

    let kind = match raw.event_type.as_str() {
        "checkout.session.completed" => {
            let session: RawCheckoutSession = serde_json::from_value(raw.data.object)
                .map_err(|e| BillingError::Webhook(e.to_string()))?;
            BillingEventKind::CheckoutCompleted {
                session_id: session.id,
                customer_email: session.customer_details.and_then(|d| d.email),
            }
        }
        "customer.subscription.updated" => {
            let sub: RawSubscription = serde_json::from_value(raw.data.object)
                .map_err(|e| BillingError::Webhook(e.to_string()))?;
            BillingEventKind::SubscriptionUpdated {
                customer_id: sub.customer,
                status: sub.status.unwrap_or_default(),
                current_period_end: sub
                    .current_period_end
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
            }
        }
        "customer.subscription.deleted" => {
            let sub: RawSubscription = serde_json::from_value(raw.data.object)
                .map_err(|e| BillingError::Webhook(e.to_string()))?;
            BillingEventKind::SubscriptionDeleted {
                customer_id: sub.customer,
            }
        }
        "invoice.payment_succeeded" => {
            let invoice: RawInvoice = serde_json::from_value(raw.data.object)
                .map_err(|e| BillingError::Webhook(e.to_string()))?;
            BillingEventKind::InvoicePaymentSucceeded {
                customer_id: invoice.customer,
                subscription_id: invoice.subscription,
            }
        }
        "invoice.payment_failed" => {
            let invoice: RawInvoice = serde_json::from_value(raw.data.object)
                .map_err(|e| BillingError::Webhook(e.to_string()))?;
            BillingEventKind::InvoicePaymentFailed {
                customer_id: invoice.customer,
            }
        }
        other => BillingEventKind::Ignored {
            event_type: other.to_string(),
        },
    };

    Ok(BillingEvent { id: raw.id, kind })
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawCheckoutSession {
    id: String,
    customer_details: Option<RawCustomerDetails>,
}

#[derive(Debug, Deserialize)]
struct RawCustomerDetails {
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSubscription {
    customer: String,
    status: Option<String>,
    current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawInvoice {
    customer: String,
    subscription: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &str, timestamp: i64, secret: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.{}", timestamp, payload).as_bytes());
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    fn checkout_payload() -> String {
        serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_123",
                    "customer_details": { "email": "buyer@example.com" }
                }
            }
        })
        .to_string()
    }

    #[test]
    fn accepts_valid_signature() {
        let decoder = WebhookDecoder::new(Some(SECRET.to_string()));
        let payload = checkout_payload();
        let sig = sign(&payload, Utc::now().timestamp(), SECRET);

        let event = decoder.verify_and_parse(payload.as_bytes(), &sig).unwrap();
        assert_eq!(event.id, "evt_1");
        match event.kind {
            BillingEventKind::CheckoutCompleted {
                session_id,
                customer_email,
            } => {
                assert_eq!(session_id, "cs_test_123");
                assert_eq!(customer_email.as_deref(), Some("buyer@example.com"));
            }
            other => panic!("unexpected event kind: {:?}", other),
        }
    }

    #[test]
    fn rejects_tampered_payload() {
        let decoder = WebhookDecoder::new(Some(SECRET.to_string()));
        let payload = checkout_payload();
        let sig = sign(&payload, Utc::now().timestamp(), SECRET);
        let tampered = payload.replace("buyer@example.com", "attacker@example.com");

        assert!(decoder.verify_and_parse(tampered.as_bytes(), &sig).is_err());
    }

    #[test]
    fn rejects_wrong_secret() {
        let decoder = WebhookDecoder::new(Some(SECRET.to_string()));
        let payload = checkout_payload();
        let sig = sign(&payload, Utc::now().timestamp(), "whsec_other");

        assert!(decoder.verify_and_parse(payload.as_bytes(), &sig).is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let decoder = WebhookDecoder::new(Some(SECRET.to_string()));
        let payload = checkout_payload();
        let sig = sign(&payload, Utc::now().timestamp() - 3600, SECRET);

        assert!(decoder.verify_and_parse(payload.as_bytes(), &sig).is_err());
    }

    #[test]
    fn rejects_malformed_signature_header() {
        let decoder = WebhookDecoder::new(Some(SECRET.to_string()));
        let payload = checkout_payload();

        assert!(decoder
            .verify_and_parse(payload.as_bytes(), "v1=deadbeef")
            .is_err());
        assert!(decoder.verify_and_parse(payload.as_bytes(), "").is_err());
    }

    #[test]
    fn parses_subscription_updated() {
        let decoder = WebhookDecoder::new(None);
        let payload = serde_json::json!({
            "id": "evt_2",
            "type": "customer.subscription.updated",
            "data": {
                "object": {
                    "id": "sub_1",
                    "customer": "cus_42",
                    "status": "past_due",
                    "current_period_end": 1_700_000_000
                }
            }
        })
        .to_string();

        let event = decoder.parse_unsigned(payload.as_bytes()).unwrap();
        match event.kind {
            BillingEventKind::SubscriptionUpdated {
                customer_id,
                status,
                current_period_end,
            } => {
                assert_eq!(customer_id, "cus_42");
                assert_eq!(status, "past_due");
                assert_eq!(
                    current_period_end.map(|d| d.timestamp()),
                    Some(1_700_000_000)
                );
            }
            other => panic!("unexpected event kind: {:?}", other),
        }
    }

    #[test]
    fn parses_invoice_events() {
        let decoder = WebhookDecoder::new(None);
        let payload = serde_json::json!({
            "id": "evt_3",
            "type": "invoice.payment_succeeded",
            "data": {
                "object": {
                    "id": "in_1",
                    "customer": "cus_42",
                    "subscription": "sub_9"
                }
            }
        })
        .to_string();

        let event = decoder.parse_unsigned(payload.as_bytes()).unwrap();
        match event.kind {
            BillingEventKind::InvoicePaymentSucceeded {
                customer_id,
                subscription_id,
            } => {
                assert_eq!(customer_id, "cus_42");
                assert_eq!(subscription_id.as_deref(), Some("sub_9"));
            }
            other => panic!("unexpected event kind: {:?}", other),
        }
    }

    #[test]
    fn unknown_event_types_are_ignored() {
        let decoder = WebhookDecoder::new(None);
        let payload = serde_json::json!({
            "id": "evt_4",
            "type": "customer.created",
            "data": { "object": {} }
        })
        .to_string();

        let event = decoder.parse_unsigned(payload.as_bytes()).unwrap();
        assert!(matches!(
            event.kind,
            BillingEventKind::Ignored { ref event_type } if event_type == "customer.created"
        ));
    }
}
