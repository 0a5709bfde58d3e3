use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::features::admin::handlers;
use crate::features::admin::services::AdminUserService;

/// Create admin routes (all require admin access)
pub fn routes(service: Arc<AdminUserService>) -> Router {
    Router::new()
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .patch(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route(
            "/users/{id}/permissions",
            post(handlers::assign_permissions),
        )
        .route("/roles", get(handlers::list_roles))
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{
        create_admin_user, create_customer_user, create_operator_user, with_user,
    };
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn server_as(user: crate::features::auth::model::AuthenticatedUser) -> TestServer {
        let router = with_user(routes(Arc::new(AdminUserService::new())), user);
        TestServer::new(router).unwrap()
    }

    #[tokio::test]
    async fn test_admin_lists_empty_page() {
        let response = server_as(create_admin_user())
            .get("/users")
            .add_query_param("skip", 10)
            .add_query_param("take", 5)
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body, json!({"data": [], "total": 0, "skip": 10, "take": 5}));
    }

    #[tokio::test]
    async fn test_non_admins_are_forbidden() {
        for user in [create_customer_user(), create_operator_user()] {
            server_as(user)
                .get("/users")
                .expect_failure()
                .await
                .assert_status_forbidden();
        }
    }

    #[tokio::test]
    async fn test_anonymous_is_unauthorized() {
        let server = TestServer::new(routes(Arc::new(AdminUserService::new()))).unwrap();
        server
            .get("/roles")
            .expect_failure()
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_create_user_validates_payload() {
        let server = server_as(create_admin_user());

        let response = server
            .post("/users")
            .json(&json!({"email": "not-an-email", "name": "Ada", "password": "long enough"}))
            .expect_failure()
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["errors"][0], "email: must be a valid email address");

        let response = server
            .post("/users")
            .json(&json!({"email": "ada@example.com", "name": "Ada", "password": "long enough"}))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(body["email"], "ada@example.com");
        assert_eq!(body["roles"], json!(["customer"]));
        assert!(body.get("password").is_none());
    }

    #[tokio::test]
    async fn test_delete_acknowledges_soft_delete() {
        let body: Value = server_as(create_admin_user())
            .delete("/users/user-42")
            .await
            .json();
        assert_eq!(body["id"], "user-42");
        assert_eq!(body["deleted"], true);
    }
}
