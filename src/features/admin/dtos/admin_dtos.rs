use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::shared::constants::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_OPERATOR};
use crate::shared::validation::PERMISSION_REGEX;

pub const KNOWN_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_OPERATOR, ROLE_CUSTOMER];

fn validate_roles(roles: &[String]) -> Result<(), ValidationError> {
    match roles.iter().find(|r| !KNOWN_ROLES.contains(&r.as_str())) {
        Some(role) => Err(ValidationError::new("role")
            .with_message(format!("unknown role '{}'", role).into())),
        None => Ok(()),
    }
}

fn validate_permissions(permissions: &[String]) -> Result<(), ValidationError> {
    match permissions.iter().find(|p| !PERMISSION_REGEX.is_match(p)) {
        Some(permission) => Err(ValidationError::new("permission").with_message(
            format!("'{}' must be in resource:action form", permission).into(),
        )),
        None => Ok(()),
    }
}

/// User as shown in the back office
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserDto {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserDto {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, max = 128, message = "must be 1-128 characters"))]
    pub name: String,

    #[validate(length(min = 8, max = 128, message = "must be 8-128 characters"))]
    #[schema(format = Password)]
    pub password: String,

    #[serde(default)]
    #[validate(custom(function = "validate_roles"))]
    #[schema(example = json!(["operator"]))]
    pub roles: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDto {
    #[validate(email(message = "must be a valid email address"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 128, message = "must be 1-128 characters"))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_roles"))]
    pub roles: Option<Vec<String>>,

    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignPermissionsDto {
    #[validate(
        length(min = 1, max = 100, message = "must contain 1-100 permissions"),
        custom(function = "validate_permissions")
    )]
    #[schema(example = json!(["faqs:write", "service_requests:read"]))]
    pub permissions: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    /// Matches email or name
    #[validate(length(max = 200, message = "must be at most 200 characters"))]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPermissionsDto {
    pub user_id: String,
    pub permissions: Vec<String>,
}

/// Acknowledgement of a soft delete
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedUserDto {
    pub id: String,
    pub deleted: bool,
    pub deleted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoleDto {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::Name;
    use fake::Fake;

    fn create_dto(roles: Vec<String>) -> CreateUserDto {
        CreateUserDto {
            email: SafeEmail().fake(),
            name: Name().fake(),
            password: "correct horse".to_string(),
            roles,
        }
    }

    #[test]
    fn test_create_user_accepts_known_roles() {
        let dto = create_dto(vec!["operator".to_string()]);
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn test_create_user_rejects_unknown_role() {
        let dto = create_dto(vec!["root".to_string()]);
        let errors = dto.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("roles"));
    }

    #[test]
    fn test_create_user_rejects_short_password() {
        let mut dto = create_dto(vec![]);
        dto.password = "short".to_string();
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_permissions_must_be_resource_action() {
        let ok = AssignPermissionsDto {
            permissions: vec!["faqs:write".to_string()],
        };
        assert!(ok.validate().is_ok());

        let bad = AssignPermissionsDto {
            permissions: vec!["faqs:write".to_string(), "everything".to_string()],
        };
        assert!(bad.validate().is_err());

        let empty = AssignPermissionsDto {
            permissions: vec![],
        };
        assert!(empty.validate().is_err());
    }
}
