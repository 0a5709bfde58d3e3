//! Status transitions shared by every feature that moves a request along
//! (form completion, document uploads and reviews, payment webhooks).
//!
//! All functions take a connection so callers can run them inside their own
//! transaction.

use std::collections::HashSet;

use sqlx::PgConnection;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::service_requests::models::{RequestStatus, ServiceRequest};
use crate::features::service_types::models::ServiceType;

pub const SERVICE_REQUEST_COLUMNS: &str = "id, reference_number, user_id, service_type_id, status, \
     payment_id, form_data, notes, form_completed_at, documents_uploaded_at, submitted_at, \
     completed_at, created_at, updated_at";

/// Load a request and lock its row until the transaction ends
pub async fn lock_request(conn: &mut PgConnection, id: Uuid) -> Result<ServiceRequest> {
    sqlx::query_as::<_, ServiceRequest>(&format!(
        "SELECT {SERVICE_REQUEST_COLUMNS} FROM service_requests WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to lock service request: {:?}", e);
        AppError::Database(e)
    })?
    .ok_or_else(|| AppError::NotFound(format!("Service request '{}' not found", id)))
}

/// Append a row to the audit trail
pub async fn record_history(
    conn: &mut PgConnection,
    request_id: Uuid,
    from: Option<RequestStatus>,
    to: RequestStatus,
    changed_by: &str,
    reason: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO service_request_status_history
            (service_request_id, from_status, to_status, changed_by, reason)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(request_id)
    .bind(from.map(|s| s.as_str()))
    .bind(to.as_str())
    .bind(changed_by)
    .bind(reason)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record status history: {:?}", e);
        AppError::Database(e)
    })?;

    Ok(())
}

/// Move a request to `to`, stamping milestone timestamps and writing the audit row.
///
/// The caller must hold the row lock (see [`lock_request`]).
pub async fn transition(
    conn: &mut PgConnection,
    request: &ServiceRequest,
    to: RequestStatus,
    changed_by: &str,
    reason: Option<&str>,
) -> Result<ServiceRequest> {
    let from = request.status()?;
    if !from.can_transition_to(to) {
        return Err(AppError::BadRequest(format!(
            "Cannot change status from '{}' to '{}'",
            from, to
        )));
    }

    let updated = sqlx::query_as::<_, ServiceRequest>(&format!(
        r#"
        UPDATE service_requests SET
            status = $2,
            submitted_at = CASE WHEN $2 = 'submitted' THEN NOW() ELSE submitted_at END,
            completed_at = CASE WHEN $2 = 'completed' THEN NOW() ELSE completed_at END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {SERVICE_REQUEST_COLUMNS}
        "#
    ))
    .bind(request.id)
    .bind(to.as_str())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update service request status: {:?}", e);
        AppError::Database(e)
    })?;

    record_history(conn, request.id, Some(from), to, changed_by, reason).await?;

    tracing::info!(
        "Service request {} moved {} -> {} by {}",
        request.reference_number,
        from,
        to,
        changed_by
    );
    Ok(updated)
}

/// Required document categories with no pending or approved upload yet
pub async fn missing_required_documents(
    conn: &mut PgConnection,
    service_type: &ServiceType,
    request_id: Uuid,
) -> Result<Vec<String>> {
    let present: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT category FROM documents
        WHERE service_request_id = $1 AND status <> 'rejected'
        "#,
    )
    .bind(request_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load document categories: {:?}", e);
        AppError::Database(e)
    })?;

    Ok(missing_categories(service_type.required_categories(), &present))
}

/// Required categories not covered by `present`, in requirement order
pub fn missing_categories<'a>(
    required: impl Iterator<Item = &'a str>,
    present: &[String],
) -> Vec<String> {
    let present: HashSet<&str> = present.iter().map(String::as_str).collect();
    required
        .filter(|category| !present.contains(category))
        .map(str::to_string)
        .collect()
}

/// Status after the documents step when it may be complete
pub fn after_documents(missing: &[String]) -> RequestStatus {
    if missing.is_empty() {
        RequestStatus::Submitted
    } else {
        RequestStatus::AwaitingDocuments
    }
}
