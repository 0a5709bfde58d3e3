use std::sync::Arc;

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::error::{map_db_error, AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::documents::dtos::{
    CreateDocumentDto, DocumentResponseDto, DocumentUrlDto, ReviewDecision, ReviewDocumentDto,
};
use crate::features::documents::models::{Document, DocumentStatus};
use crate::features::service_requests::models::{RequestStatus, ServiceRequest};
use crate::features::service_requests::services::workflow;
use crate::features::service_requests::ServiceRequestService;
use crate::features::service_types::models::ServiceType;
use crate::features::service_types::ServiceTypeService;
use crate::modules::storage::{document_key, ObjectStorage, StoredObject};

const DOCUMENT_COLUMNS: &str = "id, service_request_id, category, file_key, original_filename, \
     content_type, file_size, status, rejection_reason, uploaded_by, reviewed_by, reviewed_at, \
     created_at, updated_at";

pub struct DocumentService {
    pool: PgPool,
    storage: Arc<ObjectStorage>,
    service_types: Arc<ServiceTypeService>,
    service_requests: Arc<ServiceRequestService>,
}

impl DocumentService {
    pub fn new(
        pool: PgPool,
        storage: Arc<ObjectStorage>,
        service_types: Arc<ServiceTypeService>,
        service_requests: Arc<ServiceRequestService>,
    ) -> Self {
        Self {
            pool,
            storage,
            service_types,
            service_requests,
        }
    }

    /// Store an uploaded document and advance the request when its
    /// required documents are complete.
    pub async fn upload(
        &self,
        user: &AuthenticatedUser,
        request_id: Uuid,
        dto: CreateDocumentDto,
        data: Vec<u8>,
    ) -> Result<DocumentResponseDto> {
        let mut tx = self.pool.begin().await?;

        let request = workflow::lock_request(&mut tx, request_id).await?;
        if !user.can_access(&request.user_id) {
            return Err(request_not_found(request_id));
        }

        let status = request.status()?;
        if !status.accepts_documents() {
            return Err(AppError::BadRequest(format!(
                "Documents cannot be uploaded while the request is '{}'",
                status
            )));
        }

        let service_type = self.service_types.find(request.service_type_id).await?;
        check_requirement(&service_type, &dto)?;

        if let Some(requirement) = service_type.requirement(&dto.category) {
            let existing = count_active_in_category(&mut tx, request_id, &dto.category).await?;
            if existing >= i64::from(requirement.max_files) {
                return Err(AppError::BadRequest(format!(
                    "At most {} file(s) allowed for '{}'",
                    requirement.max_files, dto.category
                )));
            }
        }

        let file_key = document_key(request_id, &dto.category, &dto.original_filename);
        self.storage
            .upload(&file_key, &data, &dto.content_type)
            .await?;

        let inserted = sqlx::query_as::<_, Document>(&format!(
            r#"
            INSERT INTO documents
                (service_request_id, category, file_key, original_filename, content_type, file_size, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(request_id)
        .bind(&dto.category)
        .bind(&file_key)
        .bind(&dto.original_filename)
        .bind(&dto.content_type)
        .bind(dto.file_size)
        .bind(&user.user_id)
        .fetch_one(&mut *tx)
        .await;

        let document = match inserted {
            Ok(document) => document,
            Err(e) => {
                self.discard_object(&file_key).await;
                return Err(map_db_error(e, "Document already exists"));
            }
        };

        sqlx::query(
            "UPDATE service_requests SET documents_uploaded_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        self.advance_if_complete(&mut tx, &request, &service_type, &user.user_id)
            .await?;

        if let Err(e) = tx.commit().await {
            self.discard_object(&file_key).await;
            return Err(e.into());
        }

        tracing::info!(
            "Document {} ({}) uploaded to request {}",
            document.id,
            document.category,
            request.reference_number
        );
        Ok(document.into())
    }

    pub async fn list_for_request(
        &self,
        user: &AuthenticatedUser,
        request_id: Uuid,
    ) -> Result<Vec<DocumentResponseDto>> {
        self.service_requests.find_accessible(user, request_id).await?;

        let documents = sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE service_request_id = $1 ORDER BY created_at"
        ))
        .bind(request_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list documents: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, user: &AuthenticatedUser, id: Uuid) -> Result<DocumentResponseDto> {
        Ok(self.find_accessible(user, id).await?.into())
    }

    /// Document bytes for streaming back to the client
    pub async fn download(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<(Document, StoredObject)> {
        let document = self.find_accessible(user, id).await?;
        let object = self.storage.download(&document.file_key).await?;
        Ok((document, object))
    }

    pub async fn presigned_url(&self, user: &AuthenticatedUser, id: Uuid) -> Result<DocumentUrlDto> {
        let document = self.find_accessible(user, id).await?;
        let url = self.storage.presigned_url(&document.file_key).await?;
        Ok(DocumentUrlDto {
            url,
            expires_in: self.storage.presigned_url_expiry_secs(),
        })
    }

    /// Approve or reject a pending document.
    ///
    /// A rejection sends the request back to `missing_documents` when its
    /// current status allows it.
    pub async fn review(
        &self,
        operator: &AuthenticatedUser,
        id: Uuid,
        dto: ReviewDocumentDto,
    ) -> Result<DocumentResponseDto> {
        let document = self.find(id).await?;

        let mut tx = self.pool.begin().await?;
        let request = workflow::lock_request(&mut tx, document.service_request_id).await?;

        let (status, reason) = match dto.decision {
            ReviewDecision::Approved => (DocumentStatus::Approved, None),
            ReviewDecision::Rejected => (DocumentStatus::Rejected, dto.rejection_reason),
        };

        let reviewed = sqlx::query_as::<_, Document>(&format!(
            r#"
            UPDATE documents SET
                status = $2,
                rejection_reason = $3,
                reviewed_by = $4,
                reviewed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(&reason)
        .bind(&operator.user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to review document: {:?}", e);
            AppError::Database(e)
        })?
        .ok_or_else(|| AppError::BadRequest("Document has already been reviewed".to_string()))?;

        if status == DocumentStatus::Rejected
            && request
                .status()?
                .can_transition_to(RequestStatus::MissingDocuments)
        {
            let note = format!(
                "Document '{}' rejected: {}",
                reviewed.category,
                reason.as_deref().unwrap_or_default()
            );
            workflow::transition(
                &mut tx,
                &request,
                RequestStatus::MissingDocuments,
                &operator.user_id,
                Some(&note),
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Document {} {} by {}",
            reviewed.id,
            status.as_str(),
            operator.user_id
        );
        Ok(reviewed.into())
    }

    /// Remove a pending document uploaded by the caller
    pub async fn delete(&self, user: &AuthenticatedUser, id: Uuid) -> Result<()> {
        let document = self.find_accessible(user, id).await?;

        if document.uploaded_by != user.user_id && !user.is_staff() {
            return Err(AppError::Forbidden(
                "Only the uploader can delete this document".to_string(),
            ));
        }
        if document.status() != DocumentStatus::Pending {
            return Err(AppError::BadRequest(
                "Reviewed documents cannot be deleted".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let request = workflow::lock_request(&mut tx, document.service_request_id).await?;
        if !request.status()?.accepts_documents() {
            return Err(AppError::BadRequest(
                "Documents can no longer be changed for this request".to_string(),
            ));
        }

        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.discard_object(&document.file_key).await;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Document> {
        sqlx::query_as::<_, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get document: {:?}", e);
            AppError::Database(e)
        })?
        .ok_or_else(|| AppError::NotFound(format!("Document '{}' not found", id)))
    }

    /// Load a document whose request the caller may see
    async fn find_accessible(&self, user: &AuthenticatedUser, id: Uuid) -> Result<Document> {
        let document = self.find(id).await?;
        self.service_requests
            .find_accessible(user, document.service_request_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => AppError::NotFound(format!("Document '{}' not found", id)),
                other => other,
            })?;
        Ok(document)
    }

    async fn advance_if_complete(
        &self,
        conn: &mut PgConnection,
        request: &ServiceRequest,
        service_type: &ServiceType,
        changed_by: &str,
    ) -> Result<()> {
        let status = request.status()?;
        let waiting = matches!(
            status,
            RequestStatus::AwaitingDocuments | RequestStatus::MissingDocuments
        );
        if !waiting {
            return Ok(());
        }

        let missing = workflow::missing_required_documents(conn, service_type, request.id).await?;
        if workflow::after_documents(&missing) == RequestStatus::Submitted {
            workflow::transition(
                conn,
                request,
                RequestStatus::Submitted,
                changed_by,
                Some("All required documents uploaded"),
            )
            .await?;
        }
        Ok(())
    }

    /// Best-effort removal of an object that no row points at
    async fn discard_object(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!("Failed to remove orphaned object '{}': {}", key, e);
        }
    }
}

/// Check the upload against the service type's document requirements.
///
/// Types without requirements accept any category with the global MIME whitelist.
fn check_requirement(service_type: &ServiceType, dto: &CreateDocumentDto) -> Result<()> {
    if service_type.document_requirements.is_empty() {
        return Ok(());
    }

    let requirement = service_type.requirement(&dto.category).ok_or_else(|| {
        AppError::BadRequest(format!(
            "Category '{}' is not required for this service",
            dto.category
        ))
    })?;

    if !requirement.accepts(&dto.content_type) {
        return Err(AppError::BadRequest(format!(
            "File type '{}' is not accepted for '{}'",
            dto.content_type, dto.category
        )));
    }
    Ok(())
}

async fn count_active_in_category(
    conn: &mut PgConnection,
    request_id: Uuid,
    category: &str,
) -> Result<i64> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM documents
        WHERE service_request_id = $1 AND category = $2 AND status <> 'rejected'
        "#,
    )
    .bind(request_id)
    .bind(category)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to count documents: {:?}", e);
        AppError::Database(e)
    })
}

fn request_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Service request '{}' not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::service_types::models::DocumentRequirement;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sqlx::types::Json;

    fn service_type(requirements: Vec<DocumentRequirement>) -> ServiceType {
        ServiceType {
            id: Uuid::new_v4(),
            name: "Residence permit".to_string(),
            description: None,
            price: Decimal::ZERO,
            currency: "usd".to_string(),
            document_requirements: Json(requirements),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn upload(category: &str, content_type: &str) -> CreateDocumentDto {
        CreateDocumentDto {
            category: category.to_string(),
            original_filename: "scan.pdf".to_string(),
            content_type: content_type.to_string(),
            file_size: 1024,
        }
    }

    #[test]
    fn test_no_requirements_accepts_any_category() {
        let st = service_type(vec![]);
        assert!(check_requirement(&st, &upload("anything", "application/pdf")).is_ok());
    }

    #[test]
    fn test_unknown_category_rejected() {
        let st = service_type(vec![DocumentRequirement {
            category: "passport".to_string(),
            label: "Passport".to_string(),
            required: true,
            max_files: 1,
            allowed_mime_types: vec![],
        }]);
        assert!(check_requirement(&st, &upload("passport", "image/png")).is_ok());
        assert!(matches!(
            check_requirement(&st, &upload("payslip", "image/png")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_requirement_mime_types_enforced() {
        let st = service_type(vec![DocumentRequirement {
            category: "contract".to_string(),
            label: "Signed contract".to_string(),
            required: true,
            max_files: 2,
            allowed_mime_types: vec!["application/pdf".to_string()],
        }]);
        assert!(check_requirement(&st, &upload("contract", "application/pdf")).is_ok());
        assert!(check_requirement(&st, &upload("contract", "image/jpeg")).is_err());
    }
}
