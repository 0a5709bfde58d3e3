use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::core::envelope::ResponseMessage;
use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppPath, ValidatedJson};
use crate::features::auth::guards::RequireOperator;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::documents::dtos::{
    CreateDocumentDto, DocumentResponseDto, DocumentUrlDto, ReviewDocumentDto, UploadDocumentForm,
};
use crate::features::documents::services::DocumentService;
use crate::shared::types::ApiResponse;

/// Upload a document for a service request
///
/// Accepts multipart/form-data with:
/// - `file`: the document (required)
/// - `category`: requirement category it satisfies (required)
#[utoipa::path(
    post,
    path = "/api/v1/service-requests/{id}/documents",
    params(("id" = Uuid, Path, description = "Service request ID")),
    request_body(
        content = UploadDocumentForm,
        content_type = "multipart/form-data",
    ),
    responses(
        (status = 201, description = "Document uploaded", body = ApiResponse<DocumentResponseDto>),
        (status = 400, description = "Invalid file, category or request status"),
        (status = 404, description = "Service request not found"),
        (status = 502, description = "Storage unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn upload_document(
    user: AuthenticatedUser,
    State(service): State<Arc<DocumentService>>,
    AppPath(request_id): AppPath<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, ResponseMessage, Json<DocumentResponseDto>)> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut category: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        match field.name().unwrap_or_default() {
            "file" => {
                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;
                file = Some((file_name, content_type, data.to_vec()));
            }
            "category" => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read category field: {}", e))
                })?;
                category = Some(text.trim().to_string());
            }
            other => debug!("Ignoring unknown field: {}", other),
        }
    }

    let (original_filename, content_type, data) =
        file.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;
    let category =
        category.ok_or_else(|| AppError::BadRequest("Category is required".to_string()))?;

    let dto = CreateDocumentDto {
        category,
        original_filename,
        content_type,
        file_size: data.len() as i64,
    };
    dto.validate()?;

    let document = service.upload(&user, request_id, dto, data).await?;
    Ok((
        StatusCode::CREATED,
        ResponseMessage("Document uploaded"),
        Json(document),
    ))
}

/// List documents of a service request
#[utoipa::path(
    get,
    path = "/api/v1/service-requests/{id}/documents",
    params(("id" = Uuid, Path, description = "Service request ID")),
    responses(
        (status = 200, description = "Documents", body = ApiResponse<Vec<DocumentResponseDto>>),
        (status = 404, description = "Service request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn list_request_documents(
    user: AuthenticatedUser,
    State(service): State<Arc<DocumentService>>,
    AppPath(request_id): AppPath<Uuid>,
) -> Result<Json<Vec<DocumentResponseDto>>> {
    let documents = service.list_for_request(&user, request_id).await?;
    Ok(Json(documents))
}

/// Get document metadata
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document found", body = ApiResponse<DocumentResponseDto>),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn get_document(
    user: AuthenticatedUser,
    State(service): State<Arc<DocumentService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<DocumentResponseDto>> {
    let document = service.get(&user, id).await?;
    Ok(Json(document))
}

/// Download the document file
///
/// Responds with the raw bytes; the body is not enveloped.
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/download",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn download_document(
    user: AuthenticatedUser,
    State(service): State<Arc<DocumentService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response> {
    let (document, object) = service.download(&user, id).await?;

    let content_type = object.content_type.unwrap_or(document.content_type);
    let content_type = HeaderValue::from_str(&content_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(&document.original_filename))
        .map_err(|e| AppError::Internal(format!("Invalid content disposition: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        object.data,
    )
        .into_response())
}

/// Get a presigned download URL
#[utoipa::path(
    get,
    path = "/api/v1/documents/{id}/url",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Presigned URL", body = ApiResponse<DocumentUrlDto>),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn get_document_url(
    user: AuthenticatedUser,
    State(service): State<Arc<DocumentService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<DocumentUrlDto>> {
    let url = service.presigned_url(&user, id).await?;
    Ok(Json(url))
}

/// Approve or reject a document (operator)
#[utoipa::path(
    patch,
    path = "/api/v1/documents/{id}/review",
    params(("id" = Uuid, Path, description = "Document ID")),
    request_body = ReviewDocumentDto,
    responses(
        (status = 200, description = "Document reviewed", body = ApiResponse<DocumentResponseDto>),
        (status = 400, description = "Already reviewed or missing rejection reason"),
        (status = 403, description = "Operator access required"),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn review_document(
    RequireOperator(operator): RequireOperator,
    State(service): State<Arc<DocumentService>>,
    AppPath(id): AppPath<Uuid>,
    ValidatedJson(dto): ValidatedJson<ReviewDocumentDto>,
) -> Result<(ResponseMessage, Json<DocumentResponseDto>)> {
    let document = service.review(&operator, id, dto).await?;
    Ok((ResponseMessage("Document reviewed"), Json(document)))
}

/// Delete a pending document
#[utoipa::path(
    delete,
    path = "/api/v1/documents/{id}",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document deleted"),
        (status = 400, description = "Document already reviewed"),
        (status = 403, description = "Not the uploader"),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = [])),
    tag = "documents"
)]
pub async fn delete_document(
    user: AuthenticatedUser,
    State(service): State<Arc<DocumentService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<(ResponseMessage, Json<()>)> {
    service.delete(&user, id).await?;
    Ok((ResponseMessage("Document deleted"), Json(())))
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_escapes_name() {
        assert_eq!(
            content_disposition("scan.pdf"),
            "attachment; filename=\"scan.pdf\"; filename*=UTF-8''scan.pdf"
        );

        let value = content_disposition("pässport \"copy\".pdf");
        assert!(value.starts_with("attachment; filename=\"p_ssport _copy_.pdf\""));
        assert!(value.ends_with("p%C3%A4ssport%20%22copy%22.pdf"));
        assert!(HeaderValue::from_str(&value).is_ok());
    }
}
