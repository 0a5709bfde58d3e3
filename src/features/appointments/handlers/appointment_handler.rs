use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::core::envelope::ResponseMessage;
use crate::core::error::Result;
use crate::core::extractor::{AppPath, ValidatedJson, ValidatedQuery};
use crate::features::appointments::dtos::{
    AppointmentFilter, AppointmentResponseDto, CancelAppointmentDto, CreateAppointmentDto,
    RescheduleAppointmentDto,
};
use crate::features::appointments::services::AppointmentService;
use crate::features::auth::guards::RequireOperator;
use crate::features::auth::model::AuthenticatedUser;
use crate::shared::types::{ApiResponse, Paginated, PaginatedApiResponse, PaginationQuery};

/// Book an appointment
#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    request_body = CreateAppointmentDto,
    responses(
        (status = 201, description = "Appointment booked", body = ApiResponse<AppointmentResponseDto>),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Service request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn create_appointment(
    user: AuthenticatedUser,
    State(service): State<Arc<AppointmentService>>,
    ValidatedJson(dto): ValidatedJson<CreateAppointmentDto>,
) -> Result<(StatusCode, ResponseMessage, Json<AppointmentResponseDto>)> {
    let appointment = service.create(&user, dto).await?;
    Ok((
        StatusCode::CREATED,
        ResponseMessage("Appointment booked"),
        Json(appointment),
    ))
}

/// List appointments, earliest first
#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    params(PaginationQuery, AppointmentFilter),
    responses(
        (status = 200, description = "Appointments", body = PaginatedApiResponse<AppointmentResponseDto>)
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn list_appointments(
    user: AuthenticatedUser,
    State(service): State<Arc<AppointmentService>>,
    ValidatedQuery(page): ValidatedQuery<PaginationQuery>,
    ValidatedQuery(filter): ValidatedQuery<AppointmentFilter>,
) -> Result<Json<Paginated<AppointmentResponseDto>>> {
    let appointments = service.list(&user, &filter, &page).await?;
    Ok(Json(appointments))
}

#[utoipa::path(
    get,
    path = "/api/v1/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment found", body = ApiResponse<AppointmentResponseDto>),
        (status = 404, description = "Appointment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn get_appointment(
    user: AuthenticatedUser,
    State(service): State<Arc<AppointmentService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<AppointmentResponseDto>> {
    let appointment = service.get(&user, id).await?;
    Ok(Json(appointment))
}

/// Customer confirms the appointment
#[utoipa::path(
    post,
    path = "/api/v1/appointments/{id}/user-confirm",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment confirmed", body = ApiResponse<AppointmentResponseDto>),
        (status = 400, description = "Appointment cancelled or completed"),
        (status = 403, description = "Not the appointment's customer"),
        (status = 404, description = "Appointment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn user_confirm_appointment(
    user: AuthenticatedUser,
    State(service): State<Arc<AppointmentService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<(ResponseMessage, Json<AppointmentResponseDto>)> {
    let appointment = service.user_confirm(&user, id).await?;
    Ok((ResponseMessage("Appointment confirmed"), Json(appointment)))
}

/// Operator confirms the appointment
#[utoipa::path(
    post,
    path = "/api/v1/appointments/{id}/operator-confirm",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment confirmed", body = ApiResponse<AppointmentResponseDto>),
        (status = 400, description = "Appointment cancelled or completed"),
        (status = 403, description = "Operator access required"),
        (status = 404, description = "Appointment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn operator_confirm_appointment(
    RequireOperator(operator): RequireOperator,
    State(service): State<Arc<AppointmentService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<(ResponseMessage, Json<AppointmentResponseDto>)> {
    let appointment = service.operator_confirm(&operator, id).await?;
    Ok((ResponseMessage("Appointment confirmed"), Json(appointment)))
}

#[utoipa::path(
    post,
    path = "/api/v1/appointments/{id}/reschedule",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    request_body = RescheduleAppointmentDto,
    responses(
        (status = 200, description = "Appointment rescheduled", body = ApiResponse<AppointmentResponseDto>),
        (status = 400, description = "Validation failed or appointment closed"),
        (status = 404, description = "Appointment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn reschedule_appointment(
    user: AuthenticatedUser,
    State(service): State<Arc<AppointmentService>>,
    AppPath(id): AppPath<Uuid>,
    ValidatedJson(dto): ValidatedJson<RescheduleAppointmentDto>,
) -> Result<(ResponseMessage, Json<AppointmentResponseDto>)> {
    let appointment = service.reschedule(&user, id, dto).await?;
    Ok((ResponseMessage("Appointment rescheduled"), Json(appointment)))
}

#[utoipa::path(
    post,
    path = "/api/v1/appointments/{id}/cancel",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    request_body = CancelAppointmentDto,
    responses(
        (status = 200, description = "Appointment cancelled", body = ApiResponse<AppointmentResponseDto>),
        (status = 400, description = "Appointment already closed"),
        (status = 404, description = "Appointment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn cancel_appointment(
    user: AuthenticatedUser,
    State(service): State<Arc<AppointmentService>>,
    AppPath(id): AppPath<Uuid>,
    ValidatedJson(dto): ValidatedJson<CancelAppointmentDto>,
) -> Result<(ResponseMessage, Json<AppointmentResponseDto>)> {
    let appointment = service.cancel(&user, id, dto).await?;
    Ok((ResponseMessage("Appointment cancelled"), Json(appointment)))
}

/// Mark the appointment as held
#[utoipa::path(
    post,
    path = "/api/v1/appointments/{id}/complete",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment completed", body = ApiResponse<AppointmentResponseDto>),
        (status = 400, description = "Appointment already closed"),
        (status = 403, description = "Operator access required"),
        (status = 404, description = "Appointment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "appointments"
)]
pub async fn complete_appointment(
    RequireOperator(operator): RequireOperator,
    State(service): State<Arc<AppointmentService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<(ResponseMessage, Json<AppointmentResponseDto>)> {
    let appointment = service.complete(&operator, id).await?;
    Ok((ResponseMessage("Appointment completed"), Json(appointment)))
}
