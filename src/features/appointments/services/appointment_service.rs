use std::sync::Arc;

use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::core::error::{map_db_error, AppError, Result};
use crate::features::appointments::dtos::{
    AppointmentFilter, AppointmentResponseDto, CancelAppointmentDto, CreateAppointmentDto,
    RescheduleAppointmentDto,
};
use crate::features::appointments::models::Appointment;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::service_requests::ServiceRequestService;
use crate::shared::types::{Paginated, PaginationQuery};

const APPOINTMENT_COLUMNS: &str = "id, user_id, operator_id, service_request_id, scheduled_at, \
     duration_minutes, location, notes, user_confirmed, user_confirmed_at, operator_confirmed, \
     operator_confirmed_at, cancelled_at, cancellation_reason, completed_at, rescheduled_count, \
     created_at, updated_at";

type AppointmentQuery<'q> = QueryAs<'q, Postgres, Appointment, PgArguments>;

/// Guard appended to every mutating UPDATE
const OPEN: &str = "cancelled_at IS NULL AND completed_at IS NULL";

pub struct AppointmentService {
    pool: PgPool,
    service_requests: Arc<ServiceRequestService>,
}

impl AppointmentService {
    pub fn new(pool: PgPool, service_requests: Arc<ServiceRequestService>) -> Self {
        Self {
            pool,
            service_requests,
        }
    }

    /// Book an appointment.
    ///
    /// When it is linked to a request, the appointment belongs to the
    /// request's owner even if staff booked it.
    pub async fn create(
        &self,
        user: &AuthenticatedUser,
        dto: CreateAppointmentDto,
    ) -> Result<AppointmentResponseDto> {
        let (owner, operator) = match dto.service_request_id {
            Some(request_id) => {
                let request = self.service_requests.find_accessible(user, request_id).await?;
                let operator = user.is_staff().then(|| user.user_id.clone());
                (request.user_id, operator)
            }
            None => (user.user_id.clone(), None),
        };

        let appointment = sqlx::query_as::<_, Appointment>(&format!(
            r#"
            INSERT INTO appointments
                (user_id, operator_id, service_request_id, scheduled_at, duration_minutes, location, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        ))
        .bind(&owner)
        .bind(&operator)
        .bind(dto.service_request_id)
        .bind(dto.scheduled_at)
        .bind(dto.duration_minutes)
        .bind(&dto.location)
        .bind(&dto.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Appointment already exists"))?;

        tracing::info!(
            "Appointment {} booked for {} at {}",
            appointment.id,
            appointment.user_id,
            appointment.scheduled_at
        );
        Ok(appointment.into())
    }

    pub async fn list(
        &self,
        user: &AuthenticatedUser,
        filter: &AppointmentFilter,
        page: &PaginationQuery,
    ) -> Result<Paginated<AppointmentResponseDto>> {
        let owner = (!user.is_staff()).then_some(user.user_id.as_str());
        let include_closed = filter.include_closed.unwrap_or(true);
        let where_clause = format!(
            r#"
            WHERE ($1::text IS NULL OR user_id = $1)
              AND ($2::uuid IS NULL OR service_request_id = $2)
              AND ($3::timestamptz IS NULL OR scheduled_at >= $3)
              AND ($4::timestamptz IS NULL OR scheduled_at < $4)
              AND ($5 OR ({OPEN}))
            "#
        );

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM appointments {where_clause}"))
                .bind(owner)
                .bind(filter.service_request_id)
                .bind(filter.from)
                .bind(filter.to)
                .bind(include_closed)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to count appointments: {:?}", e);
                    AppError::Database(e)
                })?;

        let rows = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments {where_clause} \
             ORDER BY scheduled_at ASC OFFSET $6 LIMIT $7"
        ))
        .bind(owner)
        .bind(filter.service_request_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(include_closed)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list appointments: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(Paginated::new(rows, total, page.skip, page.take).map(Into::into))
    }

    pub async fn get(&self, user: &AuthenticatedUser, id: Uuid) -> Result<AppointmentResponseDto> {
        Ok(self.find_accessible(user, id).await?.into())
    }

    /// Customer confirms their own appointment
    pub async fn user_confirm(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<AppointmentResponseDto> {
        let appointment = self.find_accessible(user, id).await?;
        if appointment.user_id != user.user_id {
            return Err(AppError::Forbidden(
                "Only the customer can confirm this appointment".to_string(),
            ));
        }

        let updated = self
            .update_open(
                id,
                r#"
                user_confirmed_at = CASE WHEN user_confirmed THEN user_confirmed_at ELSE NOW() END,
                user_confirmed = TRUE
                "#,
                |q| q,
            )
            .await?;

        tracing::info!("Appointment {} confirmed by customer", id);
        Ok(updated.into())
    }

    /// Operator confirms; takes the appointment if nobody has yet
    pub async fn operator_confirm(
        &self,
        operator: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<AppointmentResponseDto> {
        let updated = self
            .update_open(
                id,
                r#"
                operator_id = COALESCE(operator_id, $2),
                operator_confirmed_at = CASE WHEN operator_confirmed THEN operator_confirmed_at ELSE NOW() END,
                operator_confirmed = TRUE
                "#,
                |q| q.bind(operator.user_id.clone()),
            )
            .await?;

        tracing::info!(
            "Appointment {} confirmed by operator {}",
            id,
            operator.user_id
        );
        Ok(updated.into())
    }

    /// Move the appointment; both sides have to confirm again
    pub async fn reschedule(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        dto: RescheduleAppointmentDto,
    ) -> Result<AppointmentResponseDto> {
        self.find_accessible(user, id).await?;

        let updated = self
            .update_open(
                id,
                r#"
                scheduled_at = $2,
                duration_minutes = COALESCE($3, duration_minutes),
                location = COALESCE($4, location),
                rescheduled_count = rescheduled_count + 1,
                user_confirmed = FALSE,
                user_confirmed_at = NULL,
                operator_confirmed = FALSE,
                operator_confirmed_at = NULL
                "#,
                |q| {
                    q.bind(dto.scheduled_at)
                        .bind(dto.duration_minutes)
                        .bind(dto.location.clone())
                },
            )
            .await?;

        tracing::info!(
            "Appointment {} rescheduled to {} (#{})",
            id,
            updated.scheduled_at,
            updated.rescheduled_count
        );
        Ok(updated.into())
    }

    pub async fn cancel(
        &self,
        user: &AuthenticatedUser,
        id: Uuid,
        dto: CancelAppointmentDto,
    ) -> Result<AppointmentResponseDto> {
        self.find_accessible(user, id).await?;

        let updated = self
            .update_open(
                id,
                "cancelled_at = NOW(), cancellation_reason = $2",
                |q| q.bind(dto.reason.clone()),
            )
            .await?;

        tracing::info!("Appointment {} cancelled by {}", id, user.user_id);
        Ok(updated.into())
    }

    pub async fn complete(
        &self,
        operator: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<AppointmentResponseDto> {
        let updated = self
            .update_open(
                id,
                "completed_at = NOW(), operator_id = COALESCE(operator_id, $2)",
                |q| q.bind(operator.user_id.clone()),
            )
            .await?;

        tracing::info!("Appointment {} completed by {}", id, operator.user_id);
        Ok(updated.into())
    }

    /// Apply `assignments` to an open appointment.
    ///
    /// `$1` is the id; `bind` adds `$2..`. The open check is part of the
    /// UPDATE, so a concurrent cancel cannot be overwritten.
    async fn update_open(
        &self,
        id: Uuid,
        assignments: &str,
        bind: impl for<'q> FnOnce(AppointmentQuery<'q>) -> AppointmentQuery<'q>,
    ) -> Result<Appointment> {
        let sql = format!(
            "UPDATE appointments SET {assignments}, updated_at = NOW() \
             WHERE id = $1 AND {OPEN} RETURNING {APPOINTMENT_COLUMNS}"
        );

        let updated = bind(sqlx::query_as::<_, Appointment>(&sql).bind(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update appointment: {:?}", e);
                AppError::Database(e)
            })?;

        match updated {
            Some(appointment) => Ok(appointment),
            // Either gone or closed; report which
            None => {
                self.find(id).await?.ensure_open()?;
                Err(AppError::Conflict(
                    "Appointment changed concurrently, retry".to_string(),
                ))
            }
        }
    }

    async fn find(&self, id: Uuid) -> Result<Appointment> {
        sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Appointment '{}' not found", id)))
    }

    /// Other customers' appointments look missing
    async fn find_accessible(&self, user: &AuthenticatedUser, id: Uuid) -> Result<Appointment> {
        let appointment = self.find(id).await?;
        if !user.can_access(&appointment.user_id) {
            return Err(AppError::NotFound(format!("Appointment '{}' not found", id)));
        }
        Ok(appointment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::appointments::models::AppointmentState;
    use crate::features::service_types::ServiceTypeService;
    use crate::shared::test_helpers::{create_customer_user, create_operator_user};
    use chrono::{Duration, Utc};

    fn service(pool: PgPool) -> AppointmentService {
        let service_types = Arc::new(ServiceTypeService::new(pool.clone()));
        let requests = Arc::new(ServiceRequestService::new(pool.clone(), service_types));
        AppointmentService::new(pool, requests)
    }

    fn booking() -> CreateAppointmentDto {
        CreateAppointmentDto {
            service_request_id: None,
            scheduled_at: Utc::now() + Duration::days(3),
            duration_minutes: 45,
            location: Some("Front desk".to_string()),
            notes: None,
        }
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_confirmation_timestamp_set_once(pool: PgPool) {
        let service = service(pool);
        let customer = create_customer_user();

        let booked = service.create(&customer, booking()).await.unwrap();
        let first = service.user_confirm(&customer, booked.id).await.unwrap();
        let second = service.user_confirm(&customer, booked.id).await.unwrap();

        assert!(first.user_confirmed);
        assert_eq!(first.user_confirmed_at, second.user_confirmed_at);
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_reschedule_resets_confirmations(pool: PgPool) {
        let service = service(pool);
        let customer = create_customer_user();
        let operator = create_operator_user();

        let booked = service.create(&customer, booking()).await.unwrap();
        service.user_confirm(&customer, booked.id).await.unwrap();
        let confirmed = service.operator_confirm(&operator, booked.id).await.unwrap();
        assert_eq!(confirmed.status, AppointmentState::Confirmed);
        assert_eq!(confirmed.operator_id.as_deref(), Some(operator.user_id.as_str()));

        let moved = service
            .reschedule(
                &customer,
                booked.id,
                RescheduleAppointmentDto {
                    scheduled_at: Utc::now() + Duration::days(5),
                    duration_minutes: None,
                    location: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(moved.rescheduled_count, 1);
        assert_eq!(moved.duration_minutes, 45);
        assert!(!moved.user_confirmed && !moved.operator_confirmed);
        assert!(moved.user_confirmed_at.is_none());
        assert_eq!(moved.status, AppointmentState::Scheduled);
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_cancelled_appointment_is_frozen(pool: PgPool) {
        let service = service(pool);
        let customer = create_customer_user();
        let operator = create_operator_user();

        let booked = service.create(&customer, booking()).await.unwrap();
        service
            .cancel(&customer, booked.id, CancelAppointmentDto::default())
            .await
            .unwrap();

        let err = service.complete(&operator, booked.id).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        let err = service.user_confirm(&customer, booked.id).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_customers_only_see_their_own(pool: PgPool) {
        let service = service(pool);
        let customer = create_customer_user();
        let mut other = create_customer_user();
        other.user_id = "someone-else".to_string();

        let booked = service.create(&customer, booking()).await.unwrap();

        let err = service.get(&other, booked.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let page = service
            .list(&other, &AppointmentFilter::default(), &PaginationQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }
}
