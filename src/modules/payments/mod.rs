//! Payment provider abstraction.
//!
//! The service layer only talks to [`PaymentProvider`]; the concrete
//! provider is picked once at startup from configuration.

use async_trait::async_trait;
use axum::http::HeaderMap;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core::config::PaymentConfig;
use crate::core::error::AppError;

pub mod manual;
pub mod stripe;

/// Create the configured payment provider
pub fn create_provider(config: &PaymentConfig) -> Box<dyn PaymentProvider> {
    match config {
        PaymentConfig::Stripe(stripe_config) => {
            Box::new(stripe::StripeProvider::new(stripe_config.clone()))
        }
        PaymentConfig::Manual => {
            tracing::warn!(
                "Manual payment provider enabled: webhooks are not signed, anyone who can reach \
                 POST /api/v1/payments/webhook can mark payments as paid"
            );
            Box::new(manual::ManualProvider)
        }
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment provider API error: {0}")]
    ProviderApi(String),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid payment data: {0}")]
    InvalidData(String),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::ProviderApi(msg) => AppError::ExternalService(msg),
            PaymentError::InvalidSignature(msg) => AppError::BadRequest(msg),
            PaymentError::InvalidData(msg) => AppError::BadRequest(msg),
        }
    }
}

/// What we ask the provider to charge
#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    pub amount: Decimal,
    /// ISO 4217, lowercase
    pub currency: String,
    /// Retries with the same key never create a second charge
    pub idempotency_key: String,
    pub metadata: Vec<(String, String)>,
}

/// Provider-side payment created for a [`PaymentIntentRequest`]
#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub provider_payment_id: String,
    /// Handed to the client SDK to confirm the payment
    pub client_secret: Option<String>,
    pub status: String,
}

/// Payment outcome reported by a webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    Succeeded {
        provider_payment_id: String,
    },
    Failed {
        provider_payment_id: String,
        reason: Option<String>,
    },
}

impl WebhookEvent {
    pub fn provider_payment_id(&self) -> &str {
        match self {
            WebhookEvent::Succeeded {
                provider_payment_id,
            }
            | WebhookEvent::Failed {
                provider_payment_id,
                ..
            } => provider_payment_id,
        }
    }
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Value stored in `payments.provider`
    fn name(&self) -> &'static str;

    /// Create the provider-side payment the customer will confirm
    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent>;

    /// Verify and decode a webhook delivery.
    ///
    /// `Ok(None)` means the event is authentic but not one we act on.
    fn parse_webhook(&self, headers: &HeaderMap, body: &str) -> Result<Option<WebhookEvent>>;
}

#[derive(Debug, Deserialize)]
struct EventPayload {
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: EventObject,
}

#[derive(Debug, Deserialize)]
struct EventObject {
    id: String,
    #[serde(default)]
    last_payment_error: Option<LastPaymentError>,
}

#[derive(Debug, Deserialize)]
struct LastPaymentError {
    #[serde(default)]
    message: Option<String>,
}

/// Decode a payment-intent event body (`{type, data: {object: {...}}}`)
pub(crate) fn decode_event(body: &str) -> Result<Option<WebhookEvent>> {
    let payload: EventPayload = serde_json::from_str(body)
        .map_err(|e| PaymentError::InvalidData(format!("Malformed webhook body: {}", e)))?;

    let provider_payment_id = payload.data.object.id;
    let event = match payload.event_type.as_str() {
        "payment_intent.succeeded" => Some(WebhookEvent::Succeeded {
            provider_payment_id,
        }),
        "payment_intent.payment_failed" => Some(WebhookEvent::Failed {
            provider_payment_id,
            reason: payload
                .data
                .object
                .last_payment_error
                .and_then(|e| e.message),
        }),
        other => {
            tracing::debug!("Ignoring webhook event type {}", other);
            None
        }
    };

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_succeeded_event() {
        let body = json!({
            "type": "payment_intent.succeeded",
            "data": {"object": {"id": "pi_123", "status": "succeeded"}}
        })
        .to_string();

        assert_eq!(
            decode_event(&body).unwrap(),
            Some(WebhookEvent::Succeeded {
                provider_payment_id: "pi_123".to_string()
            })
        );
    }

    #[test]
    fn test_decode_failed_event_carries_reason() {
        let body = json!({
            "type": "payment_intent.payment_failed",
            "data": {"object": {"id": "pi_9", "last_payment_error": {"message": "Card declined"}}}
        })
        .to_string();

        let event = decode_event(&body).unwrap().unwrap();
        assert_eq!(event.provider_payment_id(), "pi_9");
        assert_eq!(
            event,
            WebhookEvent::Failed {
                provider_payment_id: "pi_9".to_string(),
                reason: Some("Card declined".to_string()),
            }
        );
    }

    #[test]
    fn test_unhandled_event_is_ignored() {
        let body = json!({"type": "charge.refunded", "data": {"object": {"id": "ch_1"}}}).to_string();
        assert_eq!(decode_event(&body).unwrap(), None);
    }

    #[test]
    fn test_malformed_body_is_invalid_data() {
        assert!(matches!(
            decode_event("{\"type\": 1}"),
            Err(PaymentError::InvalidData(_))
        ));
    }
}
