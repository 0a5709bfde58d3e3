use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::workflow::{self, SERVICE_REQUEST_COLUMNS};
use crate::core::error::{map_db_error, AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::service_requests::dtos::{
    InitiateServiceRequestDto, ServiceRequestFilter, ServiceRequestResponseDto, StatusHistoryDto,
    SubmitFormDto, UpdateStatusDto,
};
use crate::features::service_requests::models::{RequestStatus, ServiceRequest, StatusHistory};
use crate::features::service_types::ServiceTypeService;
use crate::shared::numbering::record_number;
use crate::shared::types::{Paginated, PaginationQuery};

pub struct ServiceRequestService {
    pool: PgPool,
    service_types: Arc<ServiceTypeService>,
}

impl ServiceRequestService {
    pub fn new(pool: PgPool, service_types: Arc<ServiceTypeService>) -> Self {
        Self {
            pool,
            service_types,
        }
    }

    /// Open a request for an active service type.
    ///
    /// Paid services start in `payment_pending`, free ones skip to `awaiting_form`.
    pub async fn initiate(
        &self,
        user: &AuthenticatedUser,
        dto: InitiateServiceRequestDto,
    ) -> Result<ServiceRequestResponseDto> {
        let service_type = self.service_types.find(dto.service_type_id).await?;
        if !service_type.is_active {
            return Err(AppError::BadRequest(
                "Service type is not available".to_string(),
            ));
        }

        let status = if service_type.requires_payment() {
            RequestStatus::PaymentPending
        } else {
            RequestStatus::AwaitingForm
        };

        let id = Uuid::new_v4();
        let reference_number = record_number("SR", Utc::now(), id);

        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, ServiceRequest>(&format!(
            r#"
            INSERT INTO service_requests (id, reference_number, user_id, service_type_id, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SERVICE_REQUEST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&reference_number)
        .bind(&user.user_id)
        .bind(service_type.id)
        .bind(status.as_str())
        .bind(&dto.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_db_error(e, "Service request already exists"))?;

        workflow::record_history(&mut tx, id, None, status, &user.user_id, None).await?;

        tx.commit().await?;

        tracing::info!(
            "Service request {} initiated by {} for '{}' ({})",
            reference_number,
            user.user_id,
            service_type.name,
            status
        );
        request.try_into()
    }

    pub async fn list(
        &self,
        user: &AuthenticatedUser,
        filter: &ServiceRequestFilter,
        page: &PaginationQuery,
    ) -> Result<Paginated<ServiceRequestResponseDto>> {
        // Staff see every request, customers only their own
        let owner = (!user.is_staff()).then_some(user.user_id.as_str());
        let status = filter.status.map(|s| s.as_str());
        let where_clause = r#"
            WHERE ($1::text IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR service_type_id = $3)
        "#;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM service_requests {where_clause}"))
                .bind(owner)
                .bind(status)
                .bind(filter.service_type_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to count service requests: {:?}", e);
                    AppError::Database(e)
                })?;

        let rows = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {SERVICE_REQUEST_COLUMNS} FROM service_requests {where_clause} \
             ORDER BY created_at DESC OFFSET $4 LIMIT $5"
        ))
        .bind(owner)
        .bind(status)
        .bind(filter.service_type_id)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list service requests: {:?}", e);
            AppError::Database(e)
        })?;

        let data = rows
            .into_iter()
            .map(ServiceRequestResponseDto::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Paginated::new(data, total, page.skip, page.take))
    }

    pub async fn get(&self, user: &AuthenticatedUser, id: Uuid) -> Result<ServiceRequestResponseDto> {
        self.find_accessible(user, id).await?.try_into()
    }

    /// Load a request the caller may see. Other customers' requests look missing.
    pub async fn find_accessible(&self, user: &AuthenticatedUser, id: Uuid) -> Result<ServiceRequest> {
        let request = sqlx::query_as::<_, ServiceRequest>(&format!(
            "SELECT {SERVICE_REQUEST_COLUMNS} FROM service_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get service request: {:?}", e);
            AppError::Database(e)
        })?;

        request
            .filter(|r| user.can_access(&r.user_id))
            .ok_or_else(|| not_found(id))
    }

    pub async fn history(&self, user: &AuthenticatedUser, id: Uuid) -> Result<Vec<StatusHistoryDto>> {
        self.find_accessible(user, id).await?;

        let rows = sqlx::query_as::<_, StatusHistory>(
            r#"
            SELECT id, service_request_id, from_status, to_status, changed_by, reason, created_at
            FROM service_request_status_history
            WHERE service_request_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load status history: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Store the customer's form.
    ///
    /// A completed form moves the request to `awaiting_documents`, or straight
    /// to `submitted` when every required document is already there.
    pub async fn submit_form(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        dto: SubmitFormDto,
    ) -> Result<ServiceRequestResponseDto> {
        let mut tx = self.pool.begin().await?;

        let request = workflow::lock_request(&mut tx, id).await?;
        if request.user_id != user.user_id {
            return Err(not_found(id));
        }

        let current = request.status()?;
        if !matches!(current, RequestStatus::AwaitingForm | RequestStatus::Draft) {
            return Err(AppError::BadRequest(format!(
                "Form cannot be edited while the request is '{}'",
                current
            )));
        }

        let request = sqlx::query_as::<_, ServiceRequest>(&format!(
            r#"
            UPDATE service_requests SET
                form_data = $2,
                form_completed_at = CASE WHEN $3 THEN form_completed_at ELSE NOW() END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SERVICE_REQUEST_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&dto.form_data)
        .bind(dto.save_as_draft)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save form data: {:?}", e);
            AppError::Database(e)
        })?;

        let next = if dto.save_as_draft {
            RequestStatus::Draft
        } else {
            let service_type = self.service_types.find(request.service_type_id).await?;
            let missing =
                workflow::missing_required_documents(&mut tx, &service_type, request.id).await?;
            workflow::after_documents(&missing)
        };

        let request = if next == current {
            request
        } else {
            workflow::transition(&mut tx, &request, next, &user.user_id, None).await?
        };

        tx.commit().await?;
        request.try_into()
    }

    /// Operator-driven status change
    pub async fn update_status(
        &self,
        operator: &AuthenticatedUser,
        id: Uuid,
        dto: UpdateStatusDto,
    ) -> Result<ServiceRequestResponseDto> {
        let mut tx = self.pool.begin().await?;

        let request = workflow::lock_request(&mut tx, id).await?;
        let request = workflow::transition(
            &mut tx,
            &request,
            dto.status,
            &operator.user_id,
            dto.reason.as_deref(),
        )
        .await?;

        tx.commit().await?;
        request.try_into()
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Service request '{}' not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{create_customer_user, create_operator_user};
    use serde_json::json;

    async fn seed_service_type(pool: &PgPool, price: &str, requirements: serde_json::Value) -> Uuid {
        sqlx::query_scalar(
            r#"
            INSERT INTO service_types (name, price, document_requirements)
            VALUES ($1, $2::numeric, $3) RETURNING id
            "#,
        )
        .bind(format!("Service {}", Uuid::new_v4()))
        .bind(price)
        .bind(requirements)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    fn service(pool: &PgPool) -> ServiceRequestService {
        ServiceRequestService::new(pool.clone(), Arc::new(ServiceTypeService::new(pool.clone())))
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_paid_service_starts_payment_pending(pool: PgPool) {
        let service_type_id = seed_service_type(&pool, "25.00", json!([])).await;
        let customer = create_customer_user();

        let request = service(&pool)
            .initiate(
                &customer,
                InitiateServiceRequestDto {
                    service_type_id,
                    notes: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(request.status, RequestStatus::PaymentPending);
        assert!(request.reference_number.starts_with("SR-"));

        let history = service(&pool).history(&customer, request.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_status, None);
        assert_eq!(history[0].to_status, "payment_pending");
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_free_service_without_documents_submits_on_form(pool: PgPool) {
        let service_type_id = seed_service_type(&pool, "0", json!([])).await;
        let customer = create_customer_user();
        let service = service(&pool);

        let request = service
            .initiate(
                &customer,
                InitiateServiceRequestDto {
                    service_type_id,
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(request.status, RequestStatus::AwaitingForm);

        let request = service
            .submit_form(
                &customer,
                request.id,
                SubmitFormDto {
                    form_data: json!({"fullName": "Ada"}),
                    save_as_draft: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(request.status, RequestStatus::Submitted);
        assert!(request.form_completed_at.is_some());
        assert!(request.submitted_at.is_some());
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_required_documents_hold_request(pool: PgPool) {
        let service_type_id = seed_service_type(
            &pool,
            "0",
            json!([{"category": "passport", "label": "Passport", "required": true, "maxFiles": 1, "allowedMimeTypes": []}]),
        )
        .await;
        let customer = create_customer_user();
        let service = service(&pool);

        let request = service
            .initiate(
                &customer,
                InitiateServiceRequestDto {
                    service_type_id,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let request = service
            .submit_form(
                &customer,
                request.id,
                SubmitFormDto {
                    form_data: json!({"fullName": "Ada"}),
                    save_as_draft: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(request.status, RequestStatus::AwaitingDocuments);
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_illegal_status_change_rejected(pool: PgPool) {
        let service_type_id = seed_service_type(&pool, "10.00", json!([])).await;
        let customer = create_customer_user();
        let operator = create_operator_user();
        let service = service(&pool);

        let request = service
            .initiate(
                &customer,
                InitiateServiceRequestDto {
                    service_type_id,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let err = service
            .update_status(
                &operator,
                request.id,
                UpdateStatusDto {
                    status: RequestStatus::Completed,
                    reason: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let rejected = service
            .update_status(
                &operator,
                request.id,
                UpdateStatusDto {
                    status: RequestStatus::Rejected,
                    reason: Some("Duplicate request".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_customers_cannot_see_others_requests(pool: PgPool) {
        let service_type_id = seed_service_type(&pool, "0", json!([])).await;
        let customer = create_customer_user();
        let service = service(&pool);

        let request = service
            .initiate(
                &customer,
                InitiateServiceRequestDto {
                    service_type_id,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let mut stranger = create_customer_user();
        stranger.user_id = "someone-else".to_string();

        assert!(matches!(
            service.get(&stranger, request.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(service.get(&create_operator_user(), request.id).await.is_ok());
    }
}
