use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch},
    Router,
};

use crate::features::documents::handlers;
use crate::features::documents::services::DocumentService;
use crate::shared::constants::MAX_FILE_SIZE;

/// Multipart framing on top of the largest accepted file
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create routes for the documents feature
///
/// Note: This feature requires authentication
pub fn routes(service: Arc<DocumentService>) -> Router {
    Router::new()
        .route(
            "/api/v1/service-requests/{id}/documents",
            get(handlers::list_request_documents)
                .post(handlers::upload_document)
                .layer(DefaultBodyLimit::max(
                    MAX_FILE_SIZE as usize + UPLOAD_OVERHEAD_BYTES,
                )),
        )
        .route(
            "/api/v1/documents/{id}",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .route(
            "/api/v1/documents/{id}/download",
            get(handlers::download_document),
        )
        .route("/api/v1/documents/{id}/url", get(handlers::get_document_url))
        .route(
            "/api/v1/documents/{id}/review",
            patch(handlers::review_document),
        )
        .with_state(service)
}
