use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::error::AppError;

#[derive(Debug, Clone, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: String,
    pub operator_id: Option<String>,
    pub service_request_id: Option<Uuid>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub user_confirmed: bool,
    pub user_confirmed_at: Option<DateTime<Utc>>,
    pub operator_confirmed: bool,
    pub operator_confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rescheduled_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle derived from the appointment's timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentState {
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
}

impl Appointment {
    pub fn state(&self) -> AppointmentState {
        if self.cancelled_at.is_some() {
            AppointmentState::Cancelled
        } else if self.completed_at.is_some() {
            AppointmentState::Completed
        } else if self.user_confirmed && self.operator_confirmed {
            AppointmentState::Confirmed
        } else {
            AppointmentState::Scheduled
        }
    }

    /// Reject changes to cancelled or completed appointments
    pub fn ensure_open(&self) -> Result<(), AppError> {
        match self.state() {
            AppointmentState::Cancelled => Err(AppError::BadRequest(
                "Appointment has been cancelled".to_string(),
            )),
            AppointmentState::Completed => Err(AppError::BadRequest(
                "Appointment has already been completed".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
