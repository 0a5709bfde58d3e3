use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use crate::core::envelope::ResponseMessage;
use crate::core::error::Result;
use crate::core::extractor::{AppPath, ValidatedJson, ValidatedQuery};
use crate::features::auth::guards::RequireAdmin;
use crate::features::faqs::dtos::{
    CreateFaqDto, FaqFilter, FaqResponseDto, PublicFaqDto, UpdateFaqDto,
};
use crate::features::faqs::services::FaqService;
use crate::shared::types::{ApiResponse, Paginated, PaginatedApiResponse, PaginationQuery};

/// List published FAQs
#[utoipa::path(
    get,
    path = "/api/v1/faqs/public",
    params(FaqFilter),
    responses(
        (status = 200, description = "Published FAQs", body = ApiResponse<Vec<PublicFaqDto>>),
    ),
    tag = "faqs"
)]
pub async fn list_public_faqs(
    State(service): State<Arc<FaqService>>,
    ValidatedQuery(filter): ValidatedQuery<FaqFilter>,
) -> Result<Json<Vec<PublicFaqDto>>> {
    let faqs = service.list_public(&filter).await?;
    Ok(Json(faqs))
}

/// List FAQ categories
#[utoipa::path(
    get,
    path = "/api/v1/faqs/categories",
    responses(
        (status = 200, description = "Distinct categories of published FAQs", body = ApiResponse<Vec<String>>),
    ),
    tag = "faqs"
)]
pub async fn list_faq_categories(
    State(service): State<Arc<FaqService>>,
) -> Result<Json<Vec<String>>> {
    let categories = service.categories().await?;
    Ok(Json(categories))
}

/// List all FAQs (admin)
#[utoipa::path(
    get,
    path = "/api/v1/faqs",
    params(PaginationQuery, FaqFilter),
    responses(
        (status = 200, description = "Page of FAQs", body = PaginatedApiResponse<FaqResponseDto>),
    ),
    security(("bearer_auth" = [])),
    tag = "faqs"
)]
pub async fn list_faqs(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<FaqService>>,
    ValidatedQuery(page): ValidatedQuery<PaginationQuery>,
    ValidatedQuery(filter): ValidatedQuery<FaqFilter>,
) -> Result<Json<Paginated<FaqResponseDto>>> {
    let faqs = service.list(&filter, &page).await?;
    Ok(Json(faqs))
}

/// Get an FAQ (admin)
#[utoipa::path(
    get,
    path = "/api/v1/faqs/{id}",
    params(("id" = Uuid, Path, description = "FAQ ID")),
    responses(
        (status = 200, description = "FAQ found", body = ApiResponse<FaqResponseDto>),
        (status = 404, description = "FAQ not found")
    ),
    security(("bearer_auth" = [])),
    tag = "faqs"
)]
pub async fn get_faq(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<FaqService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<FaqResponseDto>> {
    let faq = service.get(id).await?;
    Ok(Json(faq))
}

/// Create an FAQ (admin)
#[utoipa::path(
    post,
    path = "/api/v1/faqs",
    request_body = CreateFaqDto,
    responses(
        (status = 201, description = "FAQ created", body = ApiResponse<FaqResponseDto>),
        (status = 400, description = "Validation failed or unknown service type")
    ),
    security(("bearer_auth" = [])),
    tag = "faqs"
)]
pub async fn create_faq(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<FaqService>>,
    ValidatedJson(dto): ValidatedJson<CreateFaqDto>,
) -> Result<(StatusCode, ResponseMessage, Json<FaqResponseDto>)> {
    let faq = service.create(dto).await?;
    Ok((StatusCode::CREATED, ResponseMessage("FAQ created"), Json(faq)))
}

/// Update an FAQ (admin)
#[utoipa::path(
    patch,
    path = "/api/v1/faqs/{id}",
    params(("id" = Uuid, Path, description = "FAQ ID")),
    request_body = UpdateFaqDto,
    responses(
        (status = 200, description = "FAQ updated", body = ApiResponse<FaqResponseDto>),
        (status = 404, description = "FAQ not found")
    ),
    security(("bearer_auth" = [])),
    tag = "faqs"
)]
pub async fn update_faq(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<FaqService>>,
    AppPath(id): AppPath<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateFaqDto>,
) -> Result<(ResponseMessage, Json<FaqResponseDto>)> {
    let faq = service.update(id, dto).await?;
    Ok((ResponseMessage("FAQ updated"), Json(faq)))
}

/// Delete an FAQ (admin)
#[utoipa::path(
    delete,
    path = "/api/v1/faqs/{id}",
    params(("id" = Uuid, Path, description = "FAQ ID")),
    responses(
        (status = 200, description = "FAQ deleted"),
        (status = 404, description = "FAQ not found")
    ),
    security(("bearer_auth" = [])),
    tag = "faqs"
)]
pub async fn delete_faq(
    RequireAdmin(_admin): RequireAdmin,
    State(service): State<Arc<FaqService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<(ResponseMessage, Json<()>)> {
    service.delete(id).await?;
    Ok((ResponseMessage("FAQ deleted"), Json(())))
}
