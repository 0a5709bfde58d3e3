use std::sync::Arc;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::features::service_requests::handlers;
use crate::features::service_requests::services::ServiceRequestService;

/// Create routes for the service requests feature
///
/// Note: This feature requires authentication
pub fn routes(service: Arc<ServiceRequestService>) -> Router {
    Router::new()
        .route(
            "/api/v1/service-requests/initiate",
            post(handlers::initiate_service_request),
        )
        .route(
            "/api/v1/service-requests",
            get(handlers::list_service_requests),
        )
        .route(
            "/api/v1/service-requests/{id}",
            get(handlers::get_service_request),
        )
        .route(
            "/api/v1/service-requests/{id}/history",
            get(handlers::get_service_request_history),
        )
        .route(
            "/api/v1/service-requests/{id}/form",
            patch(handlers::submit_service_request_form),
        )
        .route(
            "/api/v1/service-requests/{id}/status",
            patch(handlers::update_service_request_status),
        )
        .with_state(service)
}
