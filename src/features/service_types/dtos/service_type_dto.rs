use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::features::service_types::models::{DocumentRequirement, ServiceType};
use crate::shared::validation::CURRENCY_REGEX;

/// DTO for creating a service type
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceTypeDto {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    #[schema(example = "Passport renewal")]
    pub name: String,

    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,

    /// Price in major units; 0 means no payment step
    #[serde(default)]
    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = String, example = "49.99")]
    pub price: Decimal,

    #[serde(default = "default_currency")]
    #[validate(regex(path = *CURRENCY_REGEX, message = "must be a lowercase ISO 4217 code"))]
    pub currency: String,

    #[serde(default)]
    #[validate(nested, custom(function = "validate_unique_categories"))]
    pub document_requirements: Vec<DocumentRequirement>,

    pub is_active: Option<bool>,
}

/// DTO for updating a service type; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServiceTypeDto {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_price"))]
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,

    #[validate(regex(path = *CURRENCY_REGEX, message = "must be a lowercase ISO 4217 code"))]
    pub currency: Option<String>,

    #[validate(nested, custom(function = "validate_unique_categories"))]
    pub document_requirements: Option<Vec<DocumentRequirement>>,

    pub is_active: Option<bool>,
}

/// Query filters for listing service types
#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ServiceTypeFilter {
    /// Include inactive types (staff only)
    #[serde(default)]
    pub include_inactive: bool,

    /// Case-insensitive name search
    #[validate(length(max = 200))]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTypeResponseDto {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub currency: String,
    pub document_requirements: Vec<DocumentRequirement>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ServiceType> for ServiceTypeResponseDto {
    fn from(st: ServiceType) -> Self {
        Self {
            id: st.id,
            name: st.name,
            description: st.description,
            price: st.price,
            currency: st.currency,
            document_requirements: st.document_requirements.0,
            is_active: st.is_active,
            created_at: st.created_at,
            updated_at: st.updated_at,
        }
    }
}

fn default_currency() -> String {
    "usd".to_string()
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        return Err(ValidationError::new("price").with_message("must not be negative".into()));
    }
    if price.scale() > 2 {
        return Err(
            ValidationError::new("price").with_message("must have at most 2 decimal places".into()),
        );
    }
    Ok(())
}

fn validate_unique_categories(requirements: &Vec<DocumentRequirement>) -> Result<(), ValidationError> {
    let mut seen = std::collections::HashSet::new();
    for requirement in requirements {
        if !seen.insert(requirement.category.as_str()) {
            return Err(ValidationError::new("unique").with_message(
                format!("duplicate category '{}'", requirement.category).into(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> CreateServiceTypeDto {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_create_defaults() {
        let dto = parse(json!({"name": "Notary"}));
        assert!(dto.validate().is_ok());
        assert_eq!(dto.price, Decimal::ZERO);
        assert_eq!(dto.currency, "usd");
        assert!(dto.document_requirements.is_empty());
    }

    #[test]
    fn test_negative_price_rejected() {
        let dto = parse(json!({"name": "Notary", "price": "-1.00"}));
        assert!(dto.validate().unwrap_err().field_errors().contains_key("price"));
    }

    #[test]
    fn test_fractional_cents_rejected() {
        let dto = parse(json!({"name": "Notary", "price": "1.005"}));
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_duplicate_requirement_categories_rejected() {
        let dto = parse(json!({
            "name": "Visa",
            "documentRequirements": [
                {"category": "passport", "label": "Passport"},
                {"category": "passport", "label": "Passport again"}
            ]
        }));
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_nested_requirement_errors_surface() {
        let dto = parse(json!({
            "name": "Visa",
            "documentRequirements": [{"category": "Bad Slug", "label": "Passport"}]
        }));
        let errors = crate::core::error::flatten_validation_errors(&dto.validate().unwrap_err());
        assert_eq!(errors, vec!["documentRequirements[0].category: must be a lowercase slug"]);
    }
}
