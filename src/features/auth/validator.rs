use super::model::AuthenticatedUser;
use crate::core::error::AppError;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use super::jwks::JwksClient;

pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    issuer: String,
    audience: String,
    roles_claim: String,
    leeway: u64,
}

impl JwtValidator {
    pub fn new(
        jwks_client: Arc<JwksClient>,
        issuer: String,
        audience: String,
        roles_claim: String,
        leeway: Duration,
    ) -> Self {
        Self {
            jwks_client,
            issuer,
            audience,
            roles_claim,
            leeway: leeway.as_secs(),
        }
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let header = decode_header(token).map_err(|e| unauthorized(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(unauthorized(format!(
                "Unsupported algorithm: {:?}. Only RS256 is allowed",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| unauthorized("Missing kid in token header".to_string()))?;

        let decoding_key = self.jwks_client.get_key(&kid).await.map_err(|e| {
            tracing::warn!("Signing key lookup failed: {}", e);
            unauthorized(e.to_string())
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;

        let token_data = decode::<Map<String, Value>>(token, &decoding_key, &validation)
            .map_err(|e| unauthorized(e.to_string()))?;

        user_from_claims(&token_data.claims, &self.roles_claim)
    }
}

fn unauthorized(message: String) -> AppError {
    AppError::Unauthorized(format!("Invalid token: {}", message))
}

/// Build the caller identity from verified claims.
///
/// `roles_claim` may be a dotted path into nested objects (`realm_access.roles`);
/// the value may be a single string or an array of strings.
fn user_from_claims(
    claims: &Map<String, Value>,
    roles_claim: &str,
) -> Result<AuthenticatedUser, AppError> {
    let user_id = claims
        .get("sub")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| unauthorized("Missing subject".to_string()))?
        .to_string();

    let email = claims
        .get("email")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut segments = roles_claim.split('.');
    let first = segments.next().and_then(|key| claims.get(key));
    let roles_value = segments.fold(first, |value, key| value.and_then(|v| v.get(key)));

    let roles = match roles_value {
        Some(Value::String(role)) => vec![role.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    Ok(AuthenticatedUser {
        user_id,
        email,
        roles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("claims must be an object"),
        }
    }

    #[test]
    fn test_roles_from_array_claim() {
        let claims = claims(json!({"sub": "u-1", "email": "a@b.io", "roles": ["operator", 7]}));
        let user = user_from_claims(&claims, "roles").unwrap();

        assert_eq!(user.user_id, "u-1");
        assert_eq!(user.email.as_deref(), Some("a@b.io"));
        assert_eq!(user.roles, vec!["operator".to_string()]);
    }

    #[test]
    fn test_roles_from_nested_string_claim() {
        let claims = claims(json!({"sub": "u-2", "realm_access": {"roles": "admin"}}));
        let user = user_from_claims(&claims, "realm_access.roles").unwrap();
        assert!(user.is_admin());
    }

    #[test]
    fn test_missing_roles_claim_means_no_roles() {
        let claims = claims(json!({"sub": "u-3"}));
        let user = user_from_claims(&claims, "roles").unwrap();
        assert!(user.roles.is_empty());
        assert!(!user.is_staff());
    }

    #[test]
    fn test_missing_subject_is_rejected() {
        let claims = claims(json!({"roles": ["admin"]}));
        assert!(matches!(
            user_from_claims(&claims, "roles"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
