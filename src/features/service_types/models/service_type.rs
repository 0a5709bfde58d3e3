use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::shared::constants::ALLOWED_MIME_TYPES;
use crate::shared::validation::CATEGORY_REGEX;

#[derive(Debug, Clone, FromRow)]
pub struct ServiceType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub document_requirements: Json<Vec<DocumentRequirement>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceType {
    /// Whether a payment must be made before the request can proceed
    pub fn requires_payment(&self) -> bool {
        self.price > Decimal::ZERO
    }

    pub fn requirement(&self, category: &str) -> Option<&DocumentRequirement> {
        self.document_requirements
            .iter()
            .find(|r| r.category == category)
    }

    /// Categories that must have at least one document before submission
    pub fn required_categories(&self) -> impl Iterator<Item = &str> {
        self.document_requirements
            .iter()
            .filter(|r| r.required)
            .map(|r| r.category.as_str())
    }
}

/// A document the customer has to upload for a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequirement {
    /// Slug identifying the document kind (e.g., "proof-of-address")
    #[validate(regex(path = *CATEGORY_REGEX, message = "must be a lowercase slug"))]
    #[schema(example = "proof-of-address")]
    pub category: String,

    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub label: String,

    #[serde(default = "default_required")]
    pub required: bool,

    #[serde(default = "default_max_files")]
    #[validate(range(min = 1, max = 20, message = "must be between 1 and 20"))]
    pub max_files: i32,

    /// Empty means any of the globally allowed types
    #[serde(default)]
    #[validate(custom(function = "validate_mime_types"))]
    pub allowed_mime_types: Vec<String>,
}

fn default_required() -> bool {
    true
}

fn default_max_files() -> i32 {
    1
}

impl DocumentRequirement {
    pub fn accepts(&self, content_type: &str) -> bool {
        if self.allowed_mime_types.is_empty() {
            ALLOWED_MIME_TYPES.contains(&content_type)
        } else {
            self.allowed_mime_types.iter().any(|m| m == content_type)
        }
    }
}

fn validate_mime_types(types: &Vec<String>) -> Result<(), ValidationError> {
    if types.iter().all(|t| ALLOWED_MIME_TYPES.contains(&t.as_str())) {
        Ok(())
    } else {
        Err(ValidationError::new("mime_type")
            .with_message(format!("allowed types are {}", ALLOWED_MIME_TYPES.join(", ")).into()))
    }
}
