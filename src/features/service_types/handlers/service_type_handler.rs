use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::core::envelope::ResponseMessage;
use crate::core::error::Result;
use crate::core::extractor::{AppPath, ValidatedJson, ValidatedQuery};
use crate::features::auth::guards::RequireAdmin;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::service_types::dtos::{
    CreateServiceTypeDto, ServiceTypeFilter, ServiceTypeResponseDto, UpdateServiceTypeDto,
};
use crate::features::service_types::services::ServiceTypeService;
use crate::shared::types::{ApiResponse, Paginated, PaginatedApiResponse, PaginationQuery};

/// List service types
///
/// Anonymous callers and customers only see active types.
#[utoipa::path(
    get,
    path = "/api/v1/service-types",
    params(PaginationQuery, ServiceTypeFilter),
    responses(
        (status = 200, description = "Page of service types", body = PaginatedApiResponse<ServiceTypeResponseDto>),
    ),
    tag = "service-types"
)]
pub async fn list_service_types(
    user: Option<AuthenticatedUser>,
    State(service): State<Arc<ServiceTypeService>>,
    ValidatedQuery(page): ValidatedQuery<PaginationQuery>,
    ValidatedQuery(mut filter): ValidatedQuery<ServiceTypeFilter>,
) -> Result<Json<Paginated<ServiceTypeResponseDto>>> {
    filter.include_inactive &= user.is_some_and(|u| u.is_staff());
    let page = service.list(&filter, &page).await?;
    Ok(Json(page))
}

/// Get a service type
#[utoipa::path(
    get,
    path = "/api/v1/service-types/{id}",
    params(("id" = Uuid, Path, description = "Service type ID")),
    responses(
        (status = 200, description = "Service type found", body = ApiResponse<ServiceTypeResponseDto>),
        (status = 404, description = "Service type not found")
    ),
    tag = "service-types"
)]
pub async fn get_service_type(
    user: Option<AuthenticatedUser>,
    State(service): State<Arc<ServiceTypeService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ServiceTypeResponseDto>> {
    let include_inactive = user.is_some_and(|u| u.is_staff());
    let service_type = service.get(id, include_inactive).await?;
    Ok(Json(service_type))
}

/// Create a service type (admin)
#[utoipa::path(
    post,
    path = "/api/v1/service-types",
    request_body = CreateServiceTypeDto,
    responses(
        (status = 201, description = "Service type created", body = ApiResponse<ServiceTypeResponseDto>),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Name already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "service-types"
)]
pub async fn create_service_type(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<ServiceTypeService>>,
    ValidatedJson(dto): ValidatedJson<CreateServiceTypeDto>,
) -> Result<(StatusCode, ResponseMessage, Json<ServiceTypeResponseDto>)> {
    let service_type = service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        ResponseMessage("Service type created"),
        Json(service_type),
    ))
}

/// Update a service type (admin)
#[utoipa::path(
    patch,
    path = "/api/v1/service-types/{id}",
    params(("id" = Uuid, Path, description = "Service type ID")),
    request_body = UpdateServiceTypeDto,
    responses(
        (status = 200, description = "Service type updated", body = ApiResponse<ServiceTypeResponseDto>),
        (status = 404, description = "Service type not found"),
        (status = 409, description = "Name already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "service-types"
)]
pub async fn update_service_type(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<ServiceTypeService>>,
    AppPath(id): AppPath<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateServiceTypeDto>,
) -> Result<(ResponseMessage, Json<ServiceTypeResponseDto>)> {
    let service_type = service.update(id, dto).await?;
    Ok((ResponseMessage("Service type updated"), Json(service_type)))
}

/// Delete a service type (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/service-types/{id}",
    params(("id" = Uuid, Path, description = "Service type ID")),
    responses(
        (status = 200, description = "Service type deleted"),
        (status = 404, description = "Service type not found"),
        (status = 409, description = "Service type still has service requests")
    ),
    security(("bearer_auth" = [])),
    tag = "service-types"
)]
pub async fn delete_service_type(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<ServiceTypeService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<(ResponseMessage, Json<()>)> {
    service.delete(id).await?;
    Ok((ResponseMessage("Service type deleted"), Json(())))
}
