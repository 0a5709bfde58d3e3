use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::constants::{ROLE_ADMIN, ROLE_OPERATOR};

/// Caller identity resolved from a validated bearer token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    /// Identity provider subject; used as the user id across all tables
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub roles: Vec<String>,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    /// Operators and admins process requests on behalf of customers
    pub fn is_staff(&self) -> bool {
        self.is_admin() || self.has_role(ROLE_OPERATOR)
    }

    /// Whether the caller may see a record owned by `owner_id`
    pub fn can_access(&self, owner_id: &str) -> bool {
        self.is_staff() || self.user_id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(roles: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: "user-1".to_string(),
            email: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_role_hierarchy() {
        let admin = user(&["admin"]);
        assert!(admin.is_admin());
        assert!(admin.is_staff());

        let operator = user(&["operator"]);
        assert!(!operator.is_admin());
        assert!(operator.is_staff());

        let nobody = user(&[]);
        assert!(!nobody.is_admin());
        assert!(!nobody.is_staff());
    }

    #[test]
    fn test_can_access() {
        let customer = user(&["customer"]);
        assert!(customer.can_access("user-1"));
        assert!(!customer.can_access("user-2"));
        assert!(user(&["operator"]).can_access("user-2"));
    }
}
