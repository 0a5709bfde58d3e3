use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::core::envelope::ResponseMessage;
use crate::core::error::Result;
use crate::core::extractor::{AppPath, ValidatedJson, ValidatedQuery};
use crate::features::auth::guards::RequireOperator;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::service_requests::dtos::{
    InitiateServiceRequestDto, ServiceRequestFilter, ServiceRequestResponseDto, StatusHistoryDto,
    SubmitFormDto, UpdateStatusDto,
};
use crate::features::service_requests::services::ServiceRequestService;
use crate::shared::types::{ApiResponse, Paginated, PaginatedApiResponse, PaginationQuery};

/// Start a service request
#[utoipa::path(
    post,
    path = "/api/v1/service-requests/initiate",
    request_body = InitiateServiceRequestDto,
    responses(
        (status = 201, description = "Service request created", body = ApiResponse<ServiceRequestResponseDto>),
        (status = 400, description = "Validation failed or service type inactive"),
        (status = 404, description = "Service type not found")
    ),
    security(("bearer_auth" = [])),
    tag = "service-requests"
)]
pub async fn initiate_service_request(
    user: AuthenticatedUser,
    State(service): State<Arc<ServiceRequestService>>,
    ValidatedJson(dto): ValidatedJson<InitiateServiceRequestDto>,
) -> Result<(StatusCode, ResponseMessage, Json<ServiceRequestResponseDto>)> {
    let request = service.initiate(&user, dto).await?;
    Ok((
        StatusCode::CREATED,
        ResponseMessage("Service request created"),
        Json(request),
    ))
}

/// List service requests
///
/// Customers get their own requests; operators and admins get all of them.
#[utoipa::path(
    get,
    path = "/api/v1/service-requests",
    params(PaginationQuery, ServiceRequestFilter),
    responses(
        (status = 200, description = "Page of service requests", body = PaginatedApiResponse<ServiceRequestResponseDto>),
    ),
    security(("bearer_auth" = [])),
    tag = "service-requests"
)]
pub async fn list_service_requests(
    user: AuthenticatedUser,
    State(service): State<Arc<ServiceRequestService>>,
    ValidatedQuery(page): ValidatedQuery<PaginationQuery>,
    ValidatedQuery(filter): ValidatedQuery<ServiceRequestFilter>,
) -> Result<Json<Paginated<ServiceRequestResponseDto>>> {
    let requests = service.list(&user, &filter, &page).await?;
    Ok(Json(requests))
}

/// Get a service request
#[utoipa::path(
    get,
    path = "/api/v1/service-requests/{id}",
    params(("id" = Uuid, Path, description = "Service request ID")),
    responses(
        (status = 200, description = "Service request found", body = ApiResponse<ServiceRequestResponseDto>),
        (status = 404, description = "Service request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "service-requests"
)]
pub async fn get_service_request(
    user: AuthenticatedUser,
    State(service): State<Arc<ServiceRequestService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ServiceRequestResponseDto>> {
    let request = service.get(&user, id).await?;
    Ok(Json(request))
}

/// Status history of a service request
#[utoipa::path(
    get,
    path = "/api/v1/service-requests/{id}/history",
    params(("id" = Uuid, Path, description = "Service request ID")),
    responses(
        (status = 200, description = "Status changes, oldest first", body = ApiResponse<Vec<StatusHistoryDto>>),
        (status = 404, description = "Service request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "service-requests"
)]
pub async fn get_service_request_history(
    user: AuthenticatedUser,
    State(service): State<Arc<ServiceRequestService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Vec<StatusHistoryDto>>> {
    let history = service.history(&user, id).await?;
    Ok(Json(history))
}

/// Submit or save the request form
#[utoipa::path(
    patch,
    path = "/api/v1/service-requests/{id}/form",
    params(("id" = Uuid, Path, description = "Service request ID")),
    request_body = SubmitFormDto,
    responses(
        (status = 200, description = "Form saved", body = ApiResponse<ServiceRequestResponseDto>),
        (status = 400, description = "Form is not editable in the current status"),
        (status = 404, description = "Service request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "service-requests"
)]
pub async fn submit_service_request_form(
    user: AuthenticatedUser,
    State(service): State<Arc<ServiceRequestService>>,
    AppPath(id): AppPath<Uuid>,
    ValidatedJson(dto): ValidatedJson<SubmitFormDto>,
) -> Result<(ResponseMessage, Json<ServiceRequestResponseDto>)> {
    let message = if dto.save_as_draft {
        "Draft saved"
    } else {
        "Form submitted"
    };
    let request = service.submit_form(&user, id, dto).await?;
    Ok((ResponseMessage(message), Json(request)))
}

/// Change the status of a service request (operator)
#[utoipa::path(
    patch,
    path = "/api/v1/service-requests/{id}/status",
    params(("id" = Uuid, Path, description = "Service request ID")),
    request_body = UpdateStatusDto,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<ServiceRequestResponseDto>),
        (status = 400, description = "Transition not allowed"),
        (status = 403, description = "Operator access required"),
        (status = 404, description = "Service request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "service-requests"
)]
pub async fn update_service_request_status(
    RequireOperator(operator): RequireOperator,
    State(service): State<Arc<ServiceRequestService>>,
    AppPath(id): AppPath<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateStatusDto>,
) -> Result<(ResponseMessage, Json<ServiceRequestResponseDto>)> {
    let request = service.update_status(&operator, id, dto).await?;
    Ok((ResponseMessage("Status updated"), Json(request)))
}
