use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::service_types::handlers;
use crate::features::service_types::services::ServiceTypeService;

/// Create routes for the service types feature
///
/// Note: reads are public; writes are guarded by `RequireAdmin`
pub fn routes(service: Arc<ServiceTypeService>) -> Router {
    Router::new()
        .route(
            "/api/v1/service-types",
            get(handlers::list_service_types).post(handlers::create_service_type),
        )
        .route(
            "/api/v1/service-types/{id}",
            get(handlers::get_service_type)
                .patch(handlers::update_service_type)
                .delete(handlers::delete_service_type),
        )
        .with_state(service)
}
