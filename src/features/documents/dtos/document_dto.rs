use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::features::documents::models::{Document, DocumentStatus};
use crate::shared::constants::{ALLOWED_MIME_TYPES, MAX_FILE_SIZE};
use crate::shared::validation::CATEGORY_REGEX;

/// Metadata of an uploaded document, validated before the bytes are stored.
///
/// Built from the multipart form; the file itself travels separately.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentDto {
    #[validate(regex(path = *CATEGORY_REGEX, message = "must be a lowercase slug"))]
    pub category: String,

    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub original_filename: String,

    #[validate(custom(function = "validate_content_type"))]
    pub content_type: String,

    #[validate(range(min = 1, max = MAX_FILE_SIZE, message = "must be between 1 byte and 15MB"))]
    pub file_size: i64,
}

/// Multipart form for document uploads (OpenAPI only; the handler reads the
/// fields with axum's `Multipart` extractor)
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadDocumentForm {
    /// The document file
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// Requirement category the document satisfies
    #[schema(example = "passport")]
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_review"))]
pub struct ReviewDocumentDto {
    pub decision: ReviewDecision,

    /// Required when rejecting; shown to the customer
    #[validate(length(min = 1, max = 1000, message = "must be 1-1000 characters"))]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponseDto {
    pub id: Uuid,
    pub service_request_id: Uuid,
    pub category: String,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub status: DocumentStatus,
    pub rejection_reason: Option<String>,
    pub uploaded_by: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponseDto {
    fn from(d: Document) -> Self {
        Self {
            status: d.status(),
            id: d.id,
            service_request_id: d.service_request_id,
            category: d.category,
            original_filename: d.original_filename,
            content_type: d.content_type,
            file_size: d.file_size,
            rejection_reason: d.rejection_reason,
            uploaded_by: d.uploaded_by,
            reviewed_by: d.reviewed_by,
            reviewed_at: d.reviewed_at,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

/// Short-lived direct download link
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUrlDto {
    pub url: String,
    /// Seconds until the link stops working
    pub expires_in: u32,
}

fn validate_content_type(content_type: &str) -> Result<(), ValidationError> {
    if ALLOWED_MIME_TYPES.contains(&content_type) {
        Ok(())
    } else {
        Err(ValidationError::new("content_type")
            .with_message(format!("allowed types are {}", ALLOWED_MIME_TYPES.join(", ")).into()))
    }
}

fn validate_review(dto: &ReviewDocumentDto) -> Result<(), ValidationError> {
    if dto.decision == ReviewDecision::Rejected && dto.rejection_reason.is_none() {
        return Err(ValidationError::new("rejection_reason")
            .with_message("rejectionReason is required when rejecting".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dto(file_size: i64) -> CreateDocumentDto {
        serde_json::from_value(json!({
            "category": "passport",
            "originalFilename": "passport.pdf",
            "contentType": "application/pdf",
            "fileSize": file_size
        }))
        .unwrap()
    }

    #[test]
    fn test_zero_file_size_rejected() {
        let errors = dto(0).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("file_size"));
    }

    #[test]
    fn test_valid_document_accepted() {
        assert!(dto(100).validate().is_ok());
    }

    #[test]
    fn test_oversized_document_rejected() {
        assert!(dto(MAX_FILE_SIZE + 1).validate().is_err());
    }

    #[test]
    fn test_disallowed_content_type_rejected() {
        let mut d = dto(100);
        d.content_type = "application/x-msdownload".to_string();
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_rejection_requires_reason() {
        let review: ReviewDocumentDto =
            serde_json::from_value(json!({"decision": "rejected"})).unwrap();
        assert!(review.validate().is_err());

        let review: ReviewDocumentDto = serde_json::from_value(
            json!({"decision": "rejected", "rejectionReason": "Photo is blurry"}),
        )
        .unwrap();
        assert!(review.validate().is_ok());

        let review: ReviewDocumentDto =
            serde_json::from_value(json!({"decision": "approved"})).unwrap();
        assert!(review.validate().is_ok());
    }
}
