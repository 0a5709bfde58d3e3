use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::rust::double_option;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::faqs::models::Faq;
use crate::shared::validation::CATEGORY_REGEX;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFaqDto {
    #[validate(length(min = 5, max = 500, message = "must be 5-500 characters"))]
    #[schema(example = "How long does a passport renewal take?")]
    pub question: String,

    #[validate(length(min = 1, max = 5000, message = "must be 1-5000 characters"))]
    pub answer: String,

    #[validate(regex(path = *CATEGORY_REGEX, message = "must be a lowercase slug"))]
    #[schema(example = "payments")]
    pub category: Option<String>,

    pub service_type_id: Option<Uuid>,

    #[serde(default)]
    #[validate(range(min = 0, max = 10000, message = "must be between 0 and 10000"))]
    pub display_order: i32,

    pub is_published: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFaqDto {
    #[validate(length(min = 5, max = 500, message = "must be 5-500 characters"))]
    pub question: Option<String>,

    #[validate(length(min = 1, max = 5000, message = "must be 1-5000 characters"))]
    pub answer: Option<String>,

    /// Omitted = unchanged, `null` = clear
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(regex(path = *CATEGORY_REGEX, message = "must be a lowercase slug"))]
    pub category: Option<Option<String>>,

    /// Omitted = unchanged, `null` = unlink from the service type
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub service_type_id: Option<Option<Uuid>>,

    #[validate(range(min = 0, max = 10000, message = "must be between 0 and 10000"))]
    pub display_order: Option<i32>,

    pub is_published: Option<bool>,
}

/// Filters for FAQ listings
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FaqFilter {
    #[validate(regex(path = *CATEGORY_REGEX, message = "must be a lowercase slug"))]
    pub category: Option<String>,

    pub service_type_id: Option<Uuid>,

    /// Case-insensitive match on question or answer (admin listing only)
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaqResponseDto {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub service_type_id: Option<Uuid>,
    pub display_order: i32,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Faq> for FaqResponseDto {
    fn from(f: Faq) -> Self {
        Self {
            id: f.id,
            question: f.question,
            answer: f.answer,
            category: f.category,
            service_type_id: f.service_type_id,
            display_order: f.display_order,
            is_published: f.is_published,
            created_at: f.created_at,
            updated_at: f.updated_at,
        }
    }
}

/// Public view of a published FAQ
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicFaqDto {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub service_type_id: Option<Uuid>,
}

impl From<Faq> for PublicFaqDto {
    fn from(f: Faq) -> Self {
        Self {
            id: f.id,
            question: f.question,
            answer: f.answer,
            category: f.category,
            service_type_id: f.service_type_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_faq_validation() {
        let dto: CreateFaqDto = serde_json::from_value(json!({
            "question": "How do I pay?",
            "answer": "By card.",
            "category": "payments"
        }))
        .unwrap();
        assert!(dto.validate().is_ok());
        assert_eq!(dto.display_order, 0);

        let dto: CreateFaqDto = serde_json::from_value(json!({
            "question": "Why?",
            "answer": "",
            "category": "Payments"
        }))
        .unwrap();
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("question"));
        assert!(fields.contains_key("answer"));
        assert!(fields.contains_key("category"));
    }

    #[test]
    fn test_update_faq_distinguishes_null_from_missing() {
        let dto: UpdateFaqDto = serde_json::from_value(json!({"answer": "Yes."})).unwrap();
        assert_eq!(dto.category, None);
        assert_eq!(dto.service_type_id, None);

        let dto: UpdateFaqDto =
            serde_json::from_value(json!({"category": null, "serviceTypeId": null})).unwrap();
        assert_eq!(dto.category, Some(None));
        assert_eq!(dto.service_type_id, Some(None));
        assert!(dto.validate().is_ok());

        let dto: UpdateFaqDto = serde_json::from_value(json!({"category": "Billing"})).unwrap();
        assert_eq!(dto.category, Some(Some("Billing".to_string())));
        assert!(dto.validate().unwrap_err().field_errors().contains_key("category"));
    }
}
