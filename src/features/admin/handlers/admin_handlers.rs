use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use crate::core::envelope::ResponseMessage;
use crate::core::error::Result;
use crate::core::extractor::{AppPath, ValidatedJson, ValidatedQuery};
use crate::features::admin::dtos::*;
use crate::features::admin::services::AdminUserService;
use crate::features::auth::guards::RequireAdmin;
use crate::shared::types::{ApiResponse, Paginated, PaginatedApiResponse, PaginationQuery};

/// List users (paginated)
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    params(PaginationQuery, UserFilter),
    responses(
        (status = 200, description = "List of users", body = PaginatedApiResponse<AdminUserDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminUserService>>,
    ValidatedQuery(page): ValidatedQuery<PaginationQuery>,
    ValidatedQuery(filter): ValidatedQuery<UserFilter>,
) -> Result<Json<Paginated<AdminUserDto>>> {
    Ok(Json(service.list_users(&filter, &page)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = ApiResponse<AdminUserDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminUserService>>,
    AppPath(id): AppPath<String>,
) -> Result<Json<AdminUserDto>> {
    Ok(Json(service.get_user(&id)))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    request_body = CreateUserDto,
    responses(
        (status = 201, description = "User created", body = ApiResponse<AdminUserDto>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_user(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminUserService>>,
    ValidatedJson(dto): ValidatedJson<CreateUserDto>,
) -> Result<(StatusCode, ResponseMessage, Json<AdminUserDto>)> {
    Ok((
        StatusCode::CREATED,
        ResponseMessage("User created"),
        Json(service.create_user(dto)),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    request_body = UpdateUserDto,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<AdminUserDto>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_user(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminUserService>>,
    AppPath(id): AppPath<String>,
    ValidatedJson(dto): ValidatedJson<UpdateUserDto>,
) -> Result<(ResponseMessage, Json<AdminUserDto>)> {
    Ok((
        ResponseMessage("User updated"),
        Json(service.update_user(&id, dto)),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = ApiResponse<DeletedUserDto>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_user(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminUserService>>,
    AppPath(id): AppPath<String>,
) -> Result<(ResponseMessage, Json<DeletedUserDto>)> {
    Ok((
        ResponseMessage("User deleted"),
        Json(service.delete_user(&id)),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{id}/permissions",
    params(("id" = String, Path, description = "User ID")),
    request_body = AssignPermissionsDto,
    responses(
        (status = 200, description = "Permissions assigned", body = ApiResponse<UserPermissionsDto>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn assign_permissions(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminUserService>>,
    AppPath(id): AppPath<String>,
    ValidatedJson(dto): ValidatedJson<AssignPermissionsDto>,
) -> Result<(ResponseMessage, Json<UserPermissionsDto>)> {
    Ok((
        ResponseMessage("Permissions assigned"),
        Json(service.assign_permissions(&id, dto)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/roles",
    responses(
        (status = 200, description = "Available roles", body = ApiResponse<Vec<RoleDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    tag = "admin",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_roles(
    RequireAdmin(_user): RequireAdmin,
    State(service): State<Arc<AdminUserService>>,
) -> Result<Json<Vec<RoleDto>>> {
    Ok(Json(service.list_roles()))
}
