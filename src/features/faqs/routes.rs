use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::faqs::handlers;
use crate::features::faqs::services::FaqService;

/// Create routes for the FAQs feature
///
/// Note: `/public` and `/categories` are open; the rest require an admin.
/// Static segments are registered before `{id}`.
pub fn routes(service: Arc<FaqService>) -> Router {
    Router::new()
        .route("/api/v1/faqs/public", get(handlers::list_public_faqs))
        .route("/api/v1/faqs/categories", get(handlers::list_faq_categories))
        .route(
            "/api/v1/faqs",
            get(handlers::list_faqs).post(handlers::create_faq),
        )
        .route(
            "/api/v1/faqs/{id}",
            get(handlers::get_faq)
                .patch(handlers::update_faq)
                .delete(handlers::delete_faq),
        )
        .with_state(service)
}
