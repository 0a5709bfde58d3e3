#[cfg(test)]
use crate::features::auth::model::AuthenticatedUser;

#[cfg(test)]
use axum::{extract::Request, middleware::Next, Router};

#[cfg(test)]
fn user_with_roles(user_id: &str, roles: &[&str]) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: user_id.to_string(),
        email: Some(format!("{}@example.com", user_id)),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

#[cfg(test)]
#[allow(dead_code)]
pub fn create_admin_user() -> AuthenticatedUser {
    user_with_roles("test-admin", &["admin"])
}

#[cfg(test)]
#[allow(dead_code)]
pub fn create_operator_user() -> AuthenticatedUser {
    user_with_roles("test-operator", &["operator"])
}

#[cfg(test)]
#[allow(dead_code)]
pub fn create_customer_user() -> AuthenticatedUser {
    user_with_roles("test-customer", &["customer"])
}

/// Inject `user` into every request, standing in for the JWT middleware
#[cfg(test)]
#[allow(dead_code)]
pub fn with_user(router: Router, user: AuthenticatedUser) -> Router {
    router.layer(axum::middleware::from_fn(
        move |mut request: Request, next: Next| {
            let user = user.clone();
            async move {
                request.extensions_mut().insert(user);
                next.run(request).await
            }
        },
    ))
}
