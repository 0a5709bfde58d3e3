use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::features::appointments::models::{Appointment, AppointmentState};

fn default_duration() -> i32 {
    30
}

fn validate_future(at: &DateTime<Utc>) -> Result<(), ValidationError> {
    if *at <= Utc::now() {
        return Err(ValidationError::new("future").with_message("must be in the future".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentDto {
    /// Request the appointment is about, if any
    pub service_request_id: Option<Uuid>,

    #[validate(custom(function = "validate_future"))]
    pub scheduled_at: DateTime<Utc>,

    #[serde(default = "default_duration")]
    #[validate(range(min = 15, max = 480, message = "must be between 15 and 480 minutes"))]
    #[schema(minimum = 15, maximum = 480, default = 30)]
    pub duration_minutes: i32,

    #[validate(length(min = 1, max = 500, message = "must be 1-500 characters"))]
    pub location: Option<String>,

    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleAppointmentDto {
    #[validate(custom(function = "validate_future"))]
    pub scheduled_at: DateTime<Utc>,

    /// Keeps the current duration when absent
    #[validate(range(min = 15, max = 480, message = "must be between 15 and 480 minutes"))]
    pub duration_minutes: Option<i32>,

    #[validate(length(min = 1, max = 500, message = "must be 1-500 characters"))]
    pub location: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelAppointmentDto {
    #[validate(length(min = 1, max = 1000, message = "must be 1-1000 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AppointmentFilter {
    pub service_request_id: Option<Uuid>,
    /// Only appointments scheduled at or after this instant
    pub from: Option<DateTime<Utc>>,
    /// Only appointments scheduled before this instant
    pub to: Option<DateTime<Utc>>,
    /// Include cancelled and completed appointments (default true)
    pub include_closed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponseDto {
    pub id: Uuid,
    pub user_id: String,
    pub operator_id: Option<String>,
    pub service_request_id: Option<Uuid>,
    pub status: AppointmentState,
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

impl From<Appointment> for AppointmentResponseDto {
    fn from(a: Appointment) -> Self {
        Self {
            status: a.state(),
            id: a.id,
            user_id: a.user_id,
            operator_id: a.operator_id,
            service_request_id: a.service_request_id,
            scheduled_at: a.scheduled_at,
            duration_minutes: a.duration_minutes,
            location: a.location,
            notes: a.notes,
            user_confirmed: a.user_confirmed,
            user_confirmed_at: a.user_confirmed_at,
            operator_confirmed: a.operator_confirmed,
            operator_confirmed_at: a.operator_confirmed_at,
            cancelled_at: a.cancelled_at,
            cancellation_reason: a.cancellation_reason,
            completed_at: a.completed_at,
            rescheduled_count: a.rescheduled_count,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> CreateAppointmentDto {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_duration_defaults_to_thirty_minutes() {
        let dto = parse(json!({"scheduledAt": Utc::now() + Duration::days(2)}));
        assert_eq!(dto.duration_minutes, 30);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_past_schedule_is_rejected() {
        let dto = parse(json!({"scheduledAt": Utc::now() - Duration::minutes(5)}));
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("scheduled_at"));
    }

    #[test]
    fn test_duration_bounds() {
        let at = Utc::now() + Duration::days(1);
        assert!(parse(json!({"scheduledAt": at, "durationMinutes": 14}))
            .validate()
            .is_err());
        assert!(parse(json!({"scheduledAt": at, "durationMinutes": 15}))
            .validate()
            .is_ok());
        assert!(parse(json!({"scheduledAt": at, "durationMinutes": 480}))
            .validate()
            .is_ok());
        assert!(parse(json!({"scheduledAt": at, "durationMinutes": 481}))
            .validate()
            .is_err());
    }
}
