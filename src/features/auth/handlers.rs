use axum::Json;

use crate::core::error::Result;
use crate::features::auth::model::AuthenticatedUser;

/// Get the authenticated caller's identity
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Caller identity", body = AuthenticatedUser),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(user: AuthenticatedUser) -> Result<Json<AuthenticatedUser>> {
    Ok(Json(user))
}
