use axum::{routing::get, Router};

use super::handlers;

pub fn routes() -> Router {
    Router::new().route("/api/v1/auth/me", get(handlers::me))
}
