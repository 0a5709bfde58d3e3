use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::appointments::handlers;
use crate::features::appointments::services::AppointmentService;

/// Create routes for the appointments feature
///
/// Note: This feature requires authentication
pub fn routes(service: Arc<AppointmentService>) -> Router {
    Router::new()
        .route(
            "/api/v1/appointments",
            get(handlers::list_appointments).post(handlers::create_appointment),
        )
        .route("/api/v1/appointments/{id}", get(handlers::get_appointment))
        .route(
            "/api/v1/appointments/{id}/user-confirm",
            post(handlers::user_confirm_appointment),
        )
        .route(
            "/api/v1/appointments/{id}/operator-confirm",
            post(handlers::operator_confirm_appointment),
        )
        .route(
            "/api/v1/appointments/{id}/reschedule",
            post(handlers::reschedule_appointment),
        )
        .route(
            "/api/v1/appointments/{id}/cancel",
            post(handlers::cancel_appointment),
        )
        .route(
            "/api/v1/appointments/{id}/complete",
            post(handlers::complete_appointment),
        )
        .with_state(service)
}
