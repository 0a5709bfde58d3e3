use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::payments::handlers;
use crate::features::payments::services::PaymentService;

/// Create routes for the payments feature
///
/// Note: This feature requires authentication
pub fn routes(service: Arc<PaymentService>) -> Router {
    Router::new()
        .route(
            "/api/v1/payments",
            get(handlers::list_payments).post(handlers::create_payment),
        )
        .route("/api/v1/payments/{id}", get(handlers::get_payment))
        .route("/api/v1/payments/{id}/invoice", get(handlers::get_invoice))
        .route("/api/v1/payments/{id}/receipt", get(handlers::get_receipt))
        .with_state(service)
}

/// Provider callbacks, authenticated by signature instead of a bearer token
pub fn webhook_routes(service: Arc<PaymentService>) -> Router {
    Router::new()
        .route("/api/v1/payments/webhook", post(handlers::payment_webhook))
        .with_state(service)
}
