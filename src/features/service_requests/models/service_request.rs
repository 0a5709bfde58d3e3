use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::RequestStatus;
use crate::core::error::AppError;

#[derive(Debug, Clone, FromRow)]
pub struct ServiceRequest {
    pub id: Uuid,
    pub reference_number: String,
    pub user_id: String,
    pub service_type_id: Uuid,
    pub status: String,
    pub payment_id: Option<Uuid>,
    pub form_data: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub form_completed_at: Option<DateTime<Utc>>,
    pub documents_uploaded_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    /// Parsed status. The column is free text, so an unknown value is a data error.
    pub fn status(&self) -> Result<RequestStatus, AppError> {
        self.status.parse().map_err(|e: String| {
            tracing::error!("Service request {} has invalid status: {}", self.id, e);
            AppError::Internal(e)
        })
    }
}

/// One row of the status audit trail
#[derive(Debug, Clone, FromRow)]
pub struct StatusHistory {
    pub id: Uuid,
    pub service_request_id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub changed_by: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
