//! Provider for local development and offline setups.
//!
//! Nothing leaves the process: intents get a generated id and webhooks are
//! accepted unsigned, so a payment can be completed by posting the event body
//! by hand. Enabling it requires `PAYMENT_ALLOW_UNSIGNED_WEBHOOKS=true`.

use async_trait::async_trait;
use axum::http::HeaderMap;
use uuid::Uuid;

use super::{decode_event, PaymentIntent, PaymentIntentRequest, PaymentProvider, Result, WebhookEvent};

pub struct ManualProvider;

#[async_trait]
impl PaymentProvider for ManualProvider {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent> {
        let provider_payment_id = format!("manual_{}", Uuid::new_v4().simple());
        tracing::info!(
            "Created manual payment {} for {} {}",
            provider_payment_id,
            request.amount,
            request.currency
        );

        Ok(PaymentIntent {
            provider_payment_id,
            client_secret: None,
            status: "requires_confirmation".to_string(),
        })
    }

    fn parse_webhook(&self, _headers: &HeaderMap, body: &str) -> Result<Option<WebhookEvent>> {
        decode_event(body)
    }
}
