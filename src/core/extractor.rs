use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, OptionalFromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;

/// JSON body extractor that reports malformed bodies in the error envelope
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

/// JSON body extractor that also runs the DTO's validation rules.
///
/// Constraint violations surface as a 400 with one message per field.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let AppJson(value) = AppJson::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query string extractor with validation and envelope-shaped rejections
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = <Query<T> as FromRequestParts<S>>::from_request_parts(parts, state)
            .await
            .map_err(query_rejection)?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Path extractor with envelope-shaped rejections (e.g. malformed UUIDs)
pub struct AppPath<T>(pub T);

impl<T, S> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match <Path<T> as FromRequestParts<S>>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(path_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    let message = match rejection {
        JsonRejection::JsonDataError(err) => format!("Invalid JSON data: {}", err.body_text()),
        JsonRejection::JsonSyntaxError(err) => format!("Invalid JSON syntax: {}", err.body_text()),
        JsonRejection::MissingJsonContentType(_) => {
            "Expected request with `Content-Type: application/json`".to_string()
        }
        _ => "Failed to parse JSON body".to_string(),
    };

    AppError::BadRequest(message)
}

fn query_rejection(rejection: QueryRejection) -> AppError {
    AppError::BadRequest(format!("Invalid query parameters: {}", rejection.body_text()))
}

fn path_rejection(rejection: PathRejection) -> AppError {
    AppError::BadRequest(format!("Invalid path parameter: {}", rejection.body_text()))
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

/// `Option<AuthenticatedUser>` for routes that also serve anonymous callers
impl<S> OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthenticatedUser>().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        routing::{get, post},
        Router,
    };
    use uuid::Uuid;
    use axum_test::TestServer;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Payload {
        #[validate(length(min = 3, message = "must be at least 3 characters"))]
        display_name: String,
    }

    async fn echo(ValidatedJson(payload): ValidatedJson<Payload>) -> Json<Value> {
        Json(json!({ "displayName": payload.display_name }))
    }

    async fn show(AppPath(id): AppPath<Uuid>) -> Json<Value> {
        Json(json!({ "id": id }))
    }

    fn server() -> TestServer {
        TestServer::new(
            Router::new()
                .route("/echo", post(echo))
                .route("/items/{id}", get(show)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_validated_json_accepts_valid_body() {
        let response = server()
            .post("/echo")
            .json(&json!({"displayName": "Ada"}))
            .await;
        response.assert_status_ok();
    }

    #[tokio::test]
    async fn test_validated_json_rejects_with_field_messages() {
        let response = server()
            .post("/echo")
            .json(&json!({"displayName": "A"}))
            .expect_failure()
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["errors"][0], "displayName: must be at least 3 characters");
    }

    #[tokio::test]
    async fn test_malformed_json_is_enveloped() {
        let response = server()
            .post("/echo")
            .content_type("application/json")
            .bytes("{not json".into())
            .expect_failure()
            .await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid JSON syntax"));
    }

    #[tokio::test]
    async fn test_path_extracts_uuid() {
        let id = Uuid::new_v4();
        let response = server().get(&format!("/items/{}", id)).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["id"], id.to_string());
    }

    #[tokio::test]
    async fn test_malformed_path_is_enveloped() {
        let response = server().get("/items/not-a-uuid").expect_failure().await;

        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid path parameter"));
    }
}
