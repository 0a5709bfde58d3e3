use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::core::error::AppError;
use crate::features::service_requests::models::{RequestStatus, ServiceRequest, StatusHistory};

/// Start a new service request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiateServiceRequestDto {
    pub service_type_id: Uuid,

    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// Fill in the request form
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFormDto {
    /// Free-form answers keyed by field name
    #[validate(custom(function = "validate_form_data"))]
    #[schema(value_type = Object)]
    pub form_data: serde_json::Value,

    /// Save without completing the form step
    #[serde(default)]
    pub save_as_draft: bool,
}

/// Operator status change
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusDto {
    pub status: RequestStatus,

    #[validate(length(min = 1, max = 1000, message = "must be 1-1000 characters"))]
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ServiceRequestFilter {
    pub status: Option<RequestStatus>,
    pub service_type_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequestResponseDto {
    pub id: Uuid,
    pub reference_number: String,
    pub user_id: String,
    pub service_type_id: Uuid,
    pub status: RequestStatus,
    pub payment_id: Option<Uuid>,
    #[schema(value_type = Option<Object>)]
    pub form_data: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub form_completed_at: Option<DateTime<Utc>>,
    pub documents_uploaded_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ServiceRequest> for ServiceRequestResponseDto {
    type Error = AppError;

    fn try_from(r: ServiceRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            status: r.status()?,
            id: r.id,
            reference_number: r.reference_number,
            user_id: r.user_id,
            service_type_id: r.service_type_id,
            payment_id: r.payment_id,
            form_data: r.form_data,
            notes: r.notes,
            form_completed_at: r.form_completed_at,
            documents_uploaded_at: r.documents_uploaded_at,
            submitted_at: r.submitted_at,
            completed_at: r.completed_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryDto {
    pub id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub changed_by: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<StatusHistory> for StatusHistoryDto {
    fn from(h: StatusHistory) -> Self {
        Self {
            id: h.id,
            from_status: h.from_status,
            to_status: h.to_status,
            changed_by: h.changed_by,
            reason: h.reason,
            created_at: h.created_at,
        }
    }
}

fn validate_form_data(value: &serde_json::Value) -> Result<(), ValidationError> {
    match value.as_object() {
        Some(map) if !map.is_empty() => Ok(()),
        Some(_) => Err(ValidationError::new("empty").with_message("must not be empty".into())),
        None => Err(ValidationError::new("object").with_message("must be a JSON object".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_data_must_be_object() {
        let dto: SubmitFormDto =
            serde_json::from_value(json!({"formData": ["not", "an", "object"]})).unwrap();
        assert!(dto.validate().is_err());

        let dto: SubmitFormDto = serde_json::from_value(json!({"formData": {}})).unwrap();
        assert!(dto.validate().is_err());

        let dto: SubmitFormDto =
            serde_json::from_value(json!({"formData": {"fullName": "Ada Lovelace"}})).unwrap();
        assert!(dto.validate().is_ok());
        assert!(!dto.save_as_draft);
    }

    #[test]
    fn test_update_status_parses_snake_case() {
        let dto: UpdateStatusDto =
            serde_json::from_value(json!({"status": "in_review", "reason": "Looks complete"}))
                .unwrap();
        assert_eq!(dto.status, RequestStatus::InReview);
        assert!(dto.validate().is_ok());

        assert!(serde_json::from_value::<UpdateStatusDto>(json!({"status": "archived"})).is_err());
    }
}
