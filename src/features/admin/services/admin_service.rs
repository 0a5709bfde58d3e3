use chrono::Utc;

use crate::features::admin::dtos::*;
use crate::shared::constants::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_OPERATOR};
use crate::shared::types::{Paginated, PaginationQuery};

/// User management facade.
///
/// Accounts are owned by the identity provider and nothing here is stored:
/// reads are empty and writes echo a synthetic user built from the payload.
#[derive(Debug, Default)]
pub struct AdminUserService;

impl AdminUserService {
    pub fn new() -> Self {
        Self
    }

    pub fn list_users(
        &self,
        filter: &UserFilter,
        page: &PaginationQuery,
    ) -> Paginated<AdminUserDto> {
        tracing::debug!("Listing users (search: {:?})", filter.search);
        Paginated::new(Vec::new(), 0, page.skip, page.take)
    }

    pub fn get_user(&self, id: &str) -> AdminUserDto {
        synthetic_user(id, None, None, vec![ROLE_CUSTOMER.to_string()])
    }

    pub fn create_user(&self, dto: CreateUserDto) -> AdminUserDto {
        let id = uuid::Uuid::now_v7().to_string();
        let roles = if dto.roles.is_empty() {
            vec![ROLE_CUSTOMER.to_string()]
        } else {
            dto.roles
        };
        tracing::info!("User {} created (not persisted)", id);
        synthetic_user(&id, Some(dto.email), Some(dto.name), roles)
    }

    pub fn update_user(&self, id: &str, dto: UpdateUserDto) -> AdminUserDto {
        let roles = dto
            .roles
            .unwrap_or_else(|| vec![ROLE_CUSTOMER.to_string()]);
        let mut user = synthetic_user(id, dto.email, dto.name, roles);
        user.is_active = dto.is_active.unwrap_or(true);
        tracing::info!("User {} updated (not persisted)", id);
        user
    }

    pub fn delete_user(&self, id: &str) -> DeletedUserDto {
        tracing::info!("User {} soft-deleted (not persisted)", id);
        DeletedUserDto {
            id: id.to_string(),
            deleted: true,
            deleted_at: Utc::now(),
        }
    }

    pub fn assign_permissions(&self, id: &str, dto: AssignPermissionsDto) -> UserPermissionsDto {
        let mut permissions = dto.permissions;
        permissions.sort();
        permissions.dedup();
        UserPermissionsDto {
            user_id: id.to_string(),
            permissions,
        }
    }

    pub fn list_roles(&self) -> Vec<RoleDto> {
        vec![
            role(ROLE_ADMIN, "Full access including user management", &["*:*"]),
            role(
                ROLE_OPERATOR,
                "Processes service requests, reviews documents, runs appointments",
                &[
                    "service_requests:write",
                    "documents:review",
                    "appointments:write",
                ],
            ),
            role(
                ROLE_CUSTOMER,
                "Starts service requests, pays, uploads documents",
                &["service_requests:own", "payments:own", "documents:own"],
            ),
        ]
    }
}

fn synthetic_user(
    id: &str,
    email: Option<String>,
    name: Option<String>,
    roles: Vec<String>,
) -> AdminUserDto {
    let now = Utc::now();
    AdminUserDto {
        id: id.to_string(),
        email,
        name,
        roles,
        permissions: Vec::new(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn role(name: &str, description: &str, permissions: &[&str]) -> RoleDto {
    RoleDto {
        name: name.to_string(),
        description: description.to_string(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_users_is_always_empty() {
        let page = PaginationQuery { skip: 20, take: 5 };
        let users = AdminUserService::new().list_users(&UserFilter::default(), &page);
        assert!(users.data.is_empty());
        assert_eq!((users.total, users.skip, users.take), (0, 20, 5));
    }

    #[test]
    fn test_assign_permissions_dedups() {
        let result = AdminUserService::new().assign_permissions(
            "u1",
            AssignPermissionsDto {
                permissions: vec![
                    "faqs:write".to_string(),
                    "documents:review".to_string(),
                    "faqs:write".to_string(),
                ],
            },
        );
        assert_eq!(result.permissions, vec!["documents:review", "faqs:write"]);
    }

    #[test]
    fn test_roles_cover_every_known_role() {
        let names: Vec<String> = AdminUserService::new()
            .list_roles()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, KNOWN_ROLES);
    }
}
