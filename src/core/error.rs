use std::borrow::Cow;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::shared::types::ErrorResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// DTO constraint violations, one message per failing field
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(flatten_validation_errors(&errors))
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, errors) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                ("Database error occurred".to_string(), None)
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                ("Internal server error".to_string(), None)
            }
            AppError::ExternalService(ref msg) => {
                tracing::error!("External service error: {}", msg);
                (msg.clone(), None)
            }
            AppError::Validation(errors) => ("Validation failed".to_string(), Some(errors)),
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg) => (msg, None),
        };

        error_response(status, message, errors)
    }
}

/// Build the standard error envelope for a status code
pub fn error_response(status: StatusCode, message: String, errors: Option<Vec<String>>) -> Response {
    let body = ErrorResponse {
        success: false,
        message,
        error: status
            .canonical_reason()
            .unwrap_or("Unknown Error")
            .to_string(),
        status_code: status.as_u16(),
        timestamp: crate::core::envelope::timestamp_now(),
        errors,
    };

    (status, Json(body)).into_response()
}

/// Convert a database error into a more specific AppError.
///
/// Unique violations (23505) become `Conflict` with the given message,
/// foreign key violations (23503) become `BadRequest`.
pub fn map_db_error(e: sqlx::Error, conflict_message: &str) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code() == Some(Cow::Borrowed("23505")) {
            return AppError::Conflict(conflict_message.to_string());
        }

        if db_err.code() == Some(Cow::Borrowed("23503")) {
            return AppError::BadRequest("Referenced record does not exist".to_string());
        }
    }

    tracing::error!("Database error: {:?}", e);
    AppError::Database(e)
}

/// Flatten nested validator errors into `field: message` strings.
///
/// Field paths use the camelCase names clients send (`documentRequirements[0].category`).
pub fn flatten_validation_errors(errors: &ValidationErrors) -> Vec<String> {
    let mut out = Vec::new();
    collect_errors(errors, "", &mut out);
    out.sort();
    out
}

fn collect_errors(errors: &ValidationErrors, prefix: &str, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        // Struct-level (schema) errors are keyed "__all__"
        let path = match (prefix.is_empty(), *field == "__all__") {
            (true, true) => String::new(),
            (false, true) => prefix.to_string(),
            (true, false) => to_camel_case(field),
            (false, false) => format!("{}.{}", prefix, to_camel_case(field)),
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("is invalid ({})", err.code));
                    if path.is_empty() {
                        out.push(message);
                    } else {
                        out.push(format!("{}: {}", path, message));
                    }
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_errors(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_errors(nested, &format!("{}[{}]", path, index), out);
                }
            }
        }
    }
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Debug, Validate, Deserialize)]
    struct Probe {
        #[validate(range(min = 1, message = "must be at least 1"))]
        file_size: i64,
        #[validate(length(min = 1))]
        name: String,
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("file_size"), "fileSize");
        assert_eq!(to_camel_case("service_type_id"), "serviceTypeId");
        assert_eq!(to_camel_case("name"), "name");
    }

    #[test]
    fn test_flatten_validation_errors() {
        let probe = Probe {
            file_size: 0,
            name: String::new(),
        };
        let errors = probe.validate().unwrap_err();
        let messages = flatten_validation_errors(&errors);

        assert_eq!(
            messages,
            vec![
                "fileSize: must be at least 1".to_string(),
                "name: is invalid (length)".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_error_envelope_shape() {
        let response = AppError::NotFound("FAQ not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "FAQ not found");
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["statusCode"], 404);
        assert!(body["timestamp"].is_string());
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_validation_envelope_lists_fields() {
        let response = AppError::Validation(vec!["fileSize: too small".to_string()]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"][0], "fileSize: too small");
    }

    #[tokio::test]
    async fn test_database_error_is_masked() {
        let response = AppError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Database error occurred");
    }
}
