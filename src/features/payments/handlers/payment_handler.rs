use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use uuid::Uuid;

use crate::core::envelope::ResponseMessage;
use crate::core::error::Result;
use crate::core::extractor::{AppPath, ValidatedJson, ValidatedQuery};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::payments::dtos::{
    CreatePaymentDto, InvoiceDto, PaymentFilter, PaymentResponseDto, ReceiptDto, WebhookAckDto,
};
use crate::features::payments::services::PaymentService;
use crate::shared::types::{ApiResponse, Paginated, PaginatedApiResponse, PaginationQuery};

/// Create a payment for a service request awaiting payment
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = CreatePaymentDto,
    responses(
        (status = 201, description = "Payment created", body = ApiResponse<PaymentResponseDto>),
        (status = 400, description = "Request is not awaiting payment"),
        (status = 404, description = "Service request not found"),
        (status = 409, description = "Request already paid"),
        (status = 502, description = "Payment provider unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn create_payment(
    user: AuthenticatedUser,
    State(service): State<Arc<PaymentService>>,
    ValidatedJson(dto): ValidatedJson<CreatePaymentDto>,
) -> Result<(StatusCode, ResponseMessage, Json<PaymentResponseDto>)> {
    let payment = service.create(&user, dto).await?;
    Ok((
        StatusCode::CREATED,
        ResponseMessage("Payment created"),
        Json(payment),
    ))
}

/// List payments (own, or all for admins)
#[utoipa::path(
    get,
    path = "/api/v1/payments",
    params(PaginationQuery, PaymentFilter),
    responses(
        (status = 200, description = "Payments", body = PaginatedApiResponse<PaymentResponseDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn list_payments(
    user: AuthenticatedUser,
    State(service): State<Arc<PaymentService>>,
    ValidatedQuery(page): ValidatedQuery<PaginationQuery>,
    ValidatedQuery(filter): ValidatedQuery<PaymentFilter>,
) -> Result<Json<Paginated<PaymentResponseDto>>> {
    let payments = service.list(&user, &filter, &page).await?;
    Ok(Json(payments))
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment found", body = ApiResponse<PaymentResponseDto>),
        (status = 404, description = "Payment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn get_payment(
    user: AuthenticatedUser,
    State(service): State<Arc<PaymentService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<PaymentResponseDto>> {
    let payment = service.get(&user, id).await?;
    Ok(Json(payment))
}

/// Invoice for a payment, in any status
#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}/invoice",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Invoice", body = ApiResponse<InvoiceDto>),
        (status = 404, description = "Payment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn get_invoice(
    user: AuthenticatedUser,
    State(service): State<Arc<PaymentService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<InvoiceDto>> {
    let invoice = service.invoice(&user, id).await?;
    Ok(Json(invoice))
}

/// Receipt for a succeeded payment
#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}/receipt",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Receipt", body = ApiResponse<ReceiptDto>),
        (status = 400, description = "Payment has not succeeded"),
        (status = 404, description = "Payment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn get_receipt(
    user: AuthenticatedUser,
    State(service): State<Arc<PaymentService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ReceiptDto>> {
    let receipt = service.receipt(&user, id).await?;
    Ok(Json(receipt))
}

/// Payment provider webhook
///
/// The raw body is needed for signature verification, so it is taken as a
/// string rather than parsed JSON.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event processed", body = ApiResponse<WebhookAckDto>),
        (status = 400, description = "Invalid signature or payload")
    ),
    tag = "payments"
)]
pub async fn payment_webhook(
    State(service): State<Arc<PaymentService>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookAckDto>> {
    service.handle_webhook(&headers, &body).await?;
    Ok(Json(WebhookAckDto { received: true }))
}
