use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::core::error::{map_db_error, AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::payments::dtos::{
    CreatePaymentDto, InvoiceDto, PaymentFilter, PaymentResponseDto, PaymentSubject, ReceiptDto,
};
use crate::features::payments::models::{Payment, PaymentStatus};
use crate::features::service_requests::models::RequestStatus;
use crate::features::service_requests::services::workflow;
use crate::features::service_types::ServiceTypeService;
use crate::modules::payments::{PaymentIntentRequest, PaymentProvider, WebhookEvent};
use crate::shared::numbering::record_number;
use crate::shared::types::{Paginated, PaginationQuery};

const PAYMENT_COLUMNS: &str = "id, user_id, service_request_id, amount, currency, status, \
     provider, provider_payment_id, client_secret, invoice_number, receipt_number, \
     failure_reason, paid_at, created_at, updated_at";

/// Recorded as `changed_by` when a webhook moves a request along
const PAYMENT_ACTOR: &str = "system:payment";

pub struct PaymentService {
    pool: PgPool,
    provider: Arc<dyn PaymentProvider>,
    service_types: Arc<ServiceTypeService>,
}

impl PaymentService {
    pub fn new(
        pool: PgPool,
        provider: Arc<dyn PaymentProvider>,
        service_types: Arc<ServiceTypeService>,
    ) -> Self {
        Self {
            pool,
            provider,
            service_types,
        }
    }

    /// Start paying for a request in `payment_pending`.
    ///
    /// The provider intent, the payment row and the request's `payment_id`
    /// are created while the request row is locked, so two concurrent
    /// attempts cannot both pass the checks. A request that already has a
    /// pending or processing payment gets that payment back.
    pub async fn create(
        &self,
        user: &AuthenticatedUser,
        dto: CreatePaymentDto,
    ) -> Result<PaymentResponseDto> {
        let mut tx = self.pool.begin().await?;

        let request = workflow::lock_request(&mut tx, dto.service_request_id).await?;
        if request.user_id != user.user_id {
            return Err(AppError::NotFound(format!(
                "Service request '{}' not found",
                dto.service_request_id
            )));
        }

        let status = request.status()?;
        if status != RequestStatus::PaymentPending {
            return Err(AppError::BadRequest(format!(
                "Service request is '{}', not awaiting payment",
                status
            )));
        }

        let already_paid: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM payments WHERE service_request_id = $1 AND status = 'succeeded')",
        )
        .bind(request.id)
        .fetch_one(&mut *tx)
        .await?;
        if already_paid {
            return Err(AppError::Conflict(
                "Service request has already been paid".to_string(),
            ));
        }

        // One live intent per request: a retry gets the open payment back
        let open = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE service_request_id = $1 AND status IN ('pending', 'processing') \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(request.id)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some(payment) = open {
            tx.commit().await?;
            tracing::debug!(
                "Reusing open payment {} for request {}",
                payment.invoice_number,
                request.reference_number
            );
            return payment.try_into();
        }

        let service_type = self.service_types.find(request.service_type_id).await?;
        if !service_type.requires_payment() {
            return Err(AppError::BadRequest(
                "Service type does not require payment".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let invoice_number = record_number("INV", Utc::now(), id);

        let intent = self
            .provider
            .create_payment_intent(&PaymentIntentRequest {
                amount: service_type.price,
                currency: service_type.currency.clone(),
                idempotency_key: id.to_string(),
                metadata: vec![
                    ("payment_id".to_string(), id.to_string()),
                    ("service_request_id".to_string(), request.id.to_string()),
                    ("invoice_number".to_string(), invoice_number.clone()),
                ],
            })
            .await?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments
                (id, user_id, service_request_id, amount, currency, status, provider,
                 provider_payment_id, client_secret, invoice_number)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&user.user_id)
        .bind(request.id)
        .bind(service_type.price)
        .bind(&service_type.currency)
        .bind(PaymentStatus::from_provider(&intent.status).as_str())
        .bind(self.provider.name())
        .bind(&intent.provider_payment_id)
        .bind(&intent.client_secret)
        .bind(&invoice_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_db_error(e, "Payment already exists"))?;

        sqlx::query("UPDATE service_requests SET payment_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(request.id)
            .bind(payment.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Payment {} ({} {}) created for request {} via {}",
            payment.invoice_number,
            payment.amount,
            payment.currency,
            request.reference_number,
            payment.provider
        );
        payment.try_into()
    }

    /// Apply a provider webhook delivery
    pub async fn handle_webhook(&self, headers: &HeaderMap, body: &str) -> Result<()> {
        let Some(event) = self.provider.parse_webhook(headers, body)? else {
            tracing::debug!("Ignoring webhook event");
            return Ok(());
        };

        let mut tx = self.pool.begin().await?;

        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE provider_payment_id = $1 FOR UPDATE"
        ))
        .bind(event.provider_payment_id())
        .fetch_optional(&mut *tx)
        .await?;

        // Unknown intents are acknowledged so the provider stops retrying
        let Some(payment) = payment else {
            tracing::warn!(
                "Webhook for unknown payment intent {}",
                event.provider_payment_id()
            );
            return Ok(());
        };

        match event {
            WebhookEvent::Succeeded { .. } => mark_succeeded(&mut tx, &payment).await?,
            WebhookEvent::Failed { reason, .. } => {
                mark_failed(&mut tx, &payment, reason.as_deref()).await?
            }
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list(
        &self,
        user: &AuthenticatedUser,
        filter: &PaymentFilter,
        page: &PaginationQuery,
    ) -> Result<Paginated<PaymentResponseDto>> {
        let owner = (!user.is_admin()).then_some(user.user_id.as_str());
        let status = filter.status.map(|s| s.as_str());
        let where_clause = r#"
            WHERE ($1::text IS NULL OR user_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR service_request_id = $3)
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM payments {where_clause}"))
            .bind(owner)
            .bind(status)
            .bind(filter.service_request_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count payments: {:?}", e);
                AppError::Database(e)
            })?;

        let rows = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments {where_clause} \
             ORDER BY created_at DESC OFFSET $4 LIMIT $5"
        ))
        .bind(owner)
        .bind(status)
        .bind(filter.service_request_id)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list payments: {:?}", e);
            AppError::Database(e)
        })?;

        let data = rows
            .into_iter()
            .map(PaymentResponseDto::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Paginated::new(data, total, page.skip, page.take))
    }

    pub async fn get(&self, user: &AuthenticatedUser, id: Uuid) -> Result<PaymentResponseDto> {
        self.find_accessible(user, id).await?.try_into()
    }

    pub async fn invoice(&self, user: &AuthenticatedUser, id: Uuid) -> Result<InvoiceDto> {
        let payment = self.find_accessible(user, id).await?;
        let subject = self.subject(&payment).await?;
        InvoiceDto::build(&payment, &subject)
    }

    pub async fn receipt(&self, user: &AuthenticatedUser, id: Uuid) -> Result<ReceiptDto> {
        let payment = self.find_accessible(user, id).await?;
        if payment.status()? != PaymentStatus::Succeeded {
            return Err(AppError::BadRequest(
                "A receipt is only available for succeeded payments".to_string(),
            ));
        }
        let subject = self.subject(&payment).await?;
        ReceiptDto::build(&payment, &subject)
    }

    /// Load a payment the caller may see. Other customers' payments look missing.
    async fn find_accessible(&self, user: &AuthenticatedUser, id: Uuid) -> Result<Payment> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .filter(|p| user.is_admin() || p.user_id == user.user_id);

        payment.ok_or_else(|| AppError::NotFound(format!("Payment '{}' not found", id)))
    }

    /// Request reference and service name printed on invoices and receipts
    async fn subject(&self, payment: &Payment) -> Result<PaymentSubject> {
        let row: Option<(String, String)> = match payment.service_request_id {
            Some(request_id) => {
                sqlx::query_as(
                    r#"
                    SELECT sr.reference_number, st.name
                    FROM service_requests sr
                    JOIN service_types st ON st.id = sr.service_type_id
                    WHERE sr.id = $1
                    "#,
                )
                .bind(request_id)
                .fetch_optional(&self.pool)
                .await?
            }
            None => None,
        };

        Ok(match row {
            Some((reference_number, name)) => PaymentSubject {
                reference_number: Some(reference_number),
                description: name,
            },
            None => PaymentSubject {
                reference_number: None,
                description: "Service fee".to_string(),
            },
        })
    }
}

async fn mark_succeeded(conn: &mut PgConnection, payment: &Payment) -> Result<()> {
    if payment.status()? == PaymentStatus::Succeeded {
        tracing::debug!("Payment {} already succeeded", payment.invoice_number);
        return Ok(());
    }

    let paid_at = Utc::now();
    let receipt_number = record_number("RCT", paid_at, payment.id);

    sqlx::query(
        r#"
        UPDATE payments SET
            status = 'succeeded',
            paid_at = $2,
            receipt_number = $3,
            failure_reason = NULL,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(payment.id)
    .bind(paid_at)
    .bind(&receipt_number)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_db_error(e, "Receipt number already issued"))?;

    tracing::info!(
        "Payment {} succeeded, receipt {}",
        payment.invoice_number,
        receipt_number
    );

    let Some(request_id) = payment.service_request_id else {
        return Ok(());
    };

    let request = workflow::lock_request(conn, request_id).await?;
    if request.payment_id != Some(payment.id) {
        sqlx::query("UPDATE service_requests SET payment_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(request_id)
            .bind(payment.id)
            .execute(&mut *conn)
            .await?;
    }

    if request.status()? == RequestStatus::PaymentPending {
        workflow::transition(
            conn,
            &request,
            RequestStatus::AwaitingForm,
            PAYMENT_ACTOR,
            Some("Payment received"),
        )
        .await?;
    }

    Ok(())
}

async fn mark_failed(conn: &mut PgConnection, payment: &Payment, reason: Option<&str>) -> Result<()> {
    if payment.status()? == PaymentStatus::Succeeded {
        tracing::warn!(
            "Ignoring failure event for settled payment {}",
            payment.invoice_number
        );
        return Ok(());
    }

    sqlx::query(
        "UPDATE payments SET status = 'failed', failure_reason = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(payment.id)
    .bind(reason)
    .execute(&mut *conn)
    .await?;

    tracing::info!(
        "Payment {} failed: {}",
        payment.invoice_number,
        reason.unwrap_or("no reason given")
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::service_requests::dtos::InitiateServiceRequestDto;
    use crate::features::service_requests::ServiceRequestService;
    use crate::features::service_types::dtos::CreateServiceTypeDto;
    use crate::modules::payments::manual::ManualProvider;
    use crate::shared::test_helpers::create_customer_user;
    use rust_decimal::Decimal;
    use serde_json::json;

    struct Fixture {
        payments: PaymentService,
        requests: ServiceRequestService,
        request_id: Uuid,
    }

    async fn fixture(pool: PgPool) -> Fixture {
        let service_types = Arc::new(ServiceTypeService::new(pool.clone()));
        let service_type = service_types
            .create(CreateServiceTypeDto {
                name: "Passport renewal".to_string(),
                description: None,
                price: Decimal::new(4990, 2),
                currency: "eur".to_string(),
                document_requirements: vec![],
                is_active: Some(true),
            })
            .await
            .unwrap();

        let requests = ServiceRequestService::new(pool.clone(), service_types.clone());
        let request = requests
            .initiate(
                &create_customer_user(),
                InitiateServiceRequestDto {
                    service_type_id: service_type.id,
                    notes: None,
                },
            )
            .await
            .unwrap();

        Fixture {
            payments: PaymentService::new(pool, Arc::new(ManualProvider), service_types),
            requests,
            request_id: request.id,
        }
    }

    fn succeeded(provider_payment_id: &str) -> String {
        json!({
            "type": "payment_intent.succeeded",
            "data": {"object": {"id": provider_payment_id}}
        })
        .to_string()
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_webhook_moves_request_to_awaiting_form(pool: PgPool) {
        let f = fixture(pool).await;
        let customer = create_customer_user();

        let payment = f
            .payments
            .create(
                &customer,
                CreatePaymentDto {
                    service_request_id: f.request_id,
                },
            )
            .await
            .unwrap();
        assert!(payment.invoice_number.starts_with("INV-"));

        let intent = payment.provider_payment_id.unwrap();
        let body = succeeded(&intent);
        f.payments
            .handle_webhook(&HeaderMap::new(), &body)
            .await
            .unwrap();
        // Redelivery is a no-op
        f.payments
            .handle_webhook(&HeaderMap::new(), &body)
            .await
            .unwrap();

        let paid = f.payments.get(&customer, payment.id).await.unwrap();
        assert_eq!(paid.status, PaymentStatus::Succeeded);
        assert!(paid.receipt_number.unwrap().starts_with("RCT-"));

        let request = f.requests.get(&customer, f.request_id).await.unwrap();
        assert_eq!(request.status, RequestStatus::AwaitingForm);
        assert_eq!(request.payment_id, Some(payment.id));

        let history = f.requests.history(&customer, f.request_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].changed_by, PAYMENT_ACTOR);
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_receipt_unavailable_until_paid(pool: PgPool) {
        let f = fixture(pool).await;
        let customer = create_customer_user();

        let payment = f
            .payments
            .create(
                &customer,
                CreatePaymentDto {
                    service_request_id: f.request_id,
                },
            )
            .await
            .unwrap();

        let invoice = f.payments.invoice(&customer, payment.id).await.unwrap();
        assert_eq!(invoice.line_items[0].description, "Passport renewal");

        let err = f.payments.receipt(&customer, payment.id).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_other_customer_cannot_pay(pool: PgPool) {
        let f = fixture(pool).await;
        let mut stranger = create_customer_user();
        stranger.user_id = "someone-else".to_string();

        let err = f
            .payments
            .create(
                &stranger,
                CreatePaymentDto {
                    service_request_id: f.request_id,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    fn failed(provider_payment_id: &str) -> String {
        json!({
            "type": "payment_intent.payment_failed",
            "data": {"object": {
                "id": provider_payment_id,
                "last_payment_error": {"message": "card declined"}
            }}
        })
        .to_string()
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_retry_reuses_open_payment(pool: PgPool) {
        let f = fixture(pool.clone()).await;
        let customer = create_customer_user();
        let dto = || CreatePaymentDto {
            service_request_id: f.request_id,
        };

        let first = f.payments.create(&customer, dto()).await.unwrap();
        let second = f.payments.create(&customer, dto()).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.provider_payment_id, second.provider_payment_id);

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE service_request_id = $1")
                .bind(f.request_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1);

        f.payments
            .handle_webhook(
                &HeaderMap::new(),
                &succeeded(&first.provider_payment_id.unwrap()),
            )
            .await
            .unwrap();

        let request = f.requests.get(&customer, f.request_id).await.unwrap();
        assert_eq!(request.status, RequestStatus::AwaitingForm);
        assert_eq!(request.payment_id, Some(first.id));
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_late_success_relinks_settled_payment(pool: PgPool) {
        let f = fixture(pool).await;
        let customer = create_customer_user();
        let dto = || CreatePaymentDto {
            service_request_id: f.request_id,
        };

        let first = f.payments.create(&customer, dto()).await.unwrap();
        let first_intent = first.provider_payment_id.clone().unwrap();
        f.payments
            .handle_webhook(&HeaderMap::new(), &failed(&first_intent))
            .await
            .unwrap();

        // A failed payment is not reused
        let second = f.payments.create(&customer, dto()).await.unwrap();
        assert_ne!(first.id, second.id);
        let request = f.requests.get(&customer, f.request_id).await.unwrap();
        assert_eq!(request.payment_id, Some(second.id));

        // The first intent settles after all
        f.payments
            .handle_webhook(&HeaderMap::new(), &succeeded(&first_intent))
            .await
            .unwrap();

        let request = f.requests.get(&customer, f.request_id).await.unwrap();
        assert_eq!(request.status, RequestStatus::AwaitingForm);
        assert_eq!(request.payment_id, Some(first.id));
    }
}
