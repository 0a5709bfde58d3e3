//! Stripe payment provider over the REST API.

use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::Sha256;

use super::{
    decode_event, PaymentError, PaymentIntent, PaymentIntentRequest, PaymentProvider, Result,
    WebhookEvent,
};
use crate::core::config::StripeConfig;

type HmacSha256 = Hmac<Sha256>;

/// Currencies Stripe charges in whole units
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

pub struct StripeProvider {
    config: StripeConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    status: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeProvider {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_payment_intent(&self, request: &PaymentIntentRequest) -> Result<PaymentIntent> {
        let amount = to_minor_units(request.amount, &request.currency)?;

        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), request.currency.clone()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        form.extend(
            request
                .metadata
                .iter()
                .map(|(k, v)| (format!("metadata[{}]", k), v.clone())),
        );

        let url = format!(
            "{}/v1/payment_intents",
            self.config.api_base.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.secret_key)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Stripe request failed: {}", e);
                PaymentError::ProviderApi("Payment provider unreachable".to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| format!("HTTP {}", status));
            tracing::error!("Stripe rejected payment intent: {}", message);
            return Err(PaymentError::ProviderApi(message));
        }

        let intent: StripePaymentIntent = response.json().await.map_err(|e| {
            tracing::error!("Unexpected Stripe response: {}", e);
            PaymentError::ProviderApi("Unexpected payment provider response".to_string())
        })?;

        tracing::info!("Created Stripe payment intent {}", intent.id);

        Ok(PaymentIntent {
            provider_payment_id: intent.id,
            client_secret: intent.client_secret,
            status: intent.status,
        })
    }

    fn parse_webhook(&self, headers: &HeaderMap, body: &str) -> Result<Option<WebhookEvent>> {
        let signature = headers
            .get("stripe-signature")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| {
                PaymentError::InvalidSignature("Missing stripe-signature header".to_string())
            })?;

        verify_signature(
            signature,
            body,
            &self.config.webhook_secret,
            self.config.webhook_tolerance_secs,
            Utc::now().timestamp(),
        )?;

        decode_event(body)
    }
}

/// Amount in the currency's smallest unit (cents for usd)
pub fn to_minor_units(amount: Decimal, currency: &str) -> Result<i64> {
    let scaled = if ZERO_DECIMAL_CURRENCIES.contains(&currency) {
        amount
    } else {
        amount * Decimal::ONE_HUNDRED
    };

    scaled
        .round()
        .to_i64()
        .filter(|v| *v > 0)
        .ok_or_else(|| PaymentError::InvalidData(format!("Invalid amount {}", amount)))
}

/// Check a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`).
///
/// The signed payload is `"{t}.{body}"`; any matching `v1` passes.
pub fn verify_signature(
    header: &str,
    body: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<()> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| PaymentError::InvalidSignature("Missing timestamp".to_string()))?;

    if (now - timestamp).abs() > tolerance_secs {
        return Err(PaymentError::InvalidSignature(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let payload = format!("{}.{}", timestamp, body);
    let matches = signatures.iter().any(|signature| {
        HmacSha256::new_from_slice(secret.as_bytes())
            .map(|mut mac| {
                mac.update(payload.as_bytes());
                mac.verify_slice(signature).is_ok()
            })
            .unwrap_or(false)
    });

    if matches {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature(
            "No matching signature".to_string(),
        ))
    }
}
