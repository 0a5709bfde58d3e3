use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::AppError;
use crate::features::payments::models::{Payment, PaymentStatus};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentDto {
    pub service_request_id: Uuid,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub service_request_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponseDto {
    pub id: Uuid,
    pub user_id: String,
    pub service_request_id: Option<Uuid>,
    #[schema(value_type = String, example = "49.90")]
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider: String,
    pub provider_payment_id: Option<String>,
    /// Pass to the provider's client SDK to confirm the payment
    pub client_secret: Option<String>,
    pub invoice_number: String,
    pub receipt_number: Option<String>,
    pub failure_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Payment> for PaymentResponseDto {
    type Error = AppError;

    fn try_from(p: Payment) -> Result<Self, Self::Error> {
        Ok(Self {
            status: p.status()?,
            id: p.id,
            user_id: p.user_id,
            service_request_id: p.service_request_id,
            amount: p.amount,
            currency: p.currency,
            provider: p.provider,
            provider_payment_id: p.provider_payment_id,
            client_secret: p.client_secret,
            invoice_number: p.invoice_number,
            receipt_number: p.receipt_number,
            failure_reason: p.failure_reason,
            paid_at: p.paid_at,
            created_at: p.created_at,
            updated_at: p.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItemDto {
    pub description: String,
    pub quantity: u32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDto {
    pub invoice_number: String,
    pub payment_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub customer_id: String,
    pub service_request_reference: Option<String>,
    pub line_items: Vec<LineItemDto>,
    #[schema(value_type = String)]
    pub subtotal: Decimal,
    #[schema(value_type = String)]
    pub total: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDto {
    pub receipt_number: String,
    pub invoice_number: String,
    pub payment_id: Uuid,
    pub customer_id: String,
    pub service_request_reference: Option<String>,
    pub description: String,
    #[schema(value_type = String)]
    pub amount_paid: Decimal,
    pub currency: String,
    pub provider: String,
    pub provider_payment_id: Option<String>,
    pub paid_at: DateTime<Utc>,
}

/// Acknowledgement returned to the payment provider
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookAckDto {
    pub received: bool,
}

/// What a payment was for, as printed on invoices and receipts
#[derive(Debug, Clone)]
pub struct PaymentSubject {
    pub reference_number: Option<String>,
    pub description: String,
}

impl InvoiceDto {
    pub fn build(payment: &Payment, subject: &PaymentSubject) -> Result<Self, AppError> {
        Ok(Self {
            invoice_number: payment.invoice_number.clone(),
            payment_id: payment.id,
            issued_at: payment.created_at,
            customer_id: payment.user_id.clone(),
            service_request_reference: subject.reference_number.clone(),
            line_items: vec![LineItemDto {
                description: subject.description.clone(),
                quantity: 1,
                unit_price: payment.amount,
                amount: payment.amount,
            }],
            subtotal: payment.amount,
            total: payment.amount,
            currency: payment.currency.clone(),
            status: payment.status()?,
        })
    }
}

impl ReceiptDto {
    /// Receipts only exist for settled payments
    pub fn build(payment: &Payment, subject: &PaymentSubject) -> Result<Self, AppError> {
        let (Some(receipt_number), Some(paid_at), PaymentStatus::Succeeded) = (
            payment.receipt_number.clone(),
            payment.paid_at,
            payment.status()?,
        ) else {
            return Err(AppError::BadRequest(
                "A receipt is only available for succeeded payments".to_string(),
            ));
        };

        Ok(Self {
            receipt_number,
            invoice_number: payment.invoice_number.clone(),
            payment_id: payment.id,
            customer_id: payment.user_id.clone(),
            service_request_reference: subject.reference_number.clone(),
            description: subject.description.clone(),
            amount_paid: payment.amount,
            currency: payment.currency.clone(),
            provider: payment.provider.clone(),
            provider_payment_id: payment.provider_payment_id.clone(),
            paid_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::prelude::FromStr;

    fn payment(status: &str) -> Payment {
        let at = Utc.with_ymd_and_hms(2025, 3, 7, 10, 0, 0).unwrap();
        Payment {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            service_request_id: Some(Uuid::new_v4()),
            amount: Decimal::from_str("49.90").unwrap(),
            currency: "eur".to_string(),
            status: status.to_string(),
            provider: "manual".to_string(),
            provider_payment_id: Some("manual_abc".to_string()),
            client_secret: None,
            invoice_number: "INV-20250307-0A1B2C3D".to_string(),
            receipt_number: (status == "succeeded").then(|| "RCT-20250307-0A1B2C3D".to_string()),
            failure_reason: None,
            paid_at: (status == "succeeded").then_some(at),
            created_at: at,
            updated_at: at,
        }
    }

    fn subject() -> PaymentSubject {
        PaymentSubject {
            reference_number: Some("SR-20250307-11111111".to_string()),
            description: "Passport renewal".to_string(),
        }
    }

    #[test]
    fn test_invoice_has_single_line_item() {
        let invoice = InvoiceDto::build(&payment("pending"), &subject()).unwrap();
        assert_eq!(invoice.line_items.len(), 1);
        assert_eq!(invoice.line_items[0].description, "Passport renewal");
        assert_eq!(invoice.total, invoice.subtotal);
        assert_eq!(invoice.status, PaymentStatus::Pending);
    }

    #[test]
    fn test_receipt_requires_succeeded_payment() {
        let err = ReceiptDto::build(&payment("pending"), &subject()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let receipt = ReceiptDto::build(&payment("succeeded"), &subject()).unwrap();
        assert_eq!(receipt.receipt_number, "RCT-20250307-0A1B2C3D");
        assert_eq!(receipt.amount_paid.to_string(), "49.90");
    }
}
