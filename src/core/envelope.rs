//! Response envelope middleware.
//!
//! Every successful handler response passes through [`envelope_middleware`],
//! which rewrites JSON bodies into the standard success envelope:
//!
//! - pass-through: non-JSON bodies (file downloads) and bodies that are
//!   already enveloped (object with a `success` key)
//! - paginated: objects carrying `data`, `total`, `skip` and `take`
//! - generic: anything else becomes `{success, message, data, timestamp}`

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, IntoResponseParts, Response, ResponseParts},
};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::core::error::error_response;
use crate::shared::constants::DEFAULT_SUCCESS_MESSAGE;
use crate::shared::types::PaginationMeta;

/// Upper bound on a JSON body the middleware will buffer for rewriting
const MAX_ENVELOPE_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Custom success message for the envelope.
///
/// Return it alongside the body from a handler:
/// ```ignore
/// Ok((ResponseMessage("FAQ created"), Json(faq)))
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ResponseMessage(pub &'static str);

impl IntoResponseParts for ResponseMessage {
    type Error = std::convert::Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        res.extensions_mut().insert(self);
        Ok(res)
    }
}

/// Current time in the envelope's timestamp format (RFC 3339, UTC, millis)
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// How a handler's JSON body is shaped into the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    PassThrough,
    Paginated,
    Generic,
}

/// Classify a JSON body
pub fn classify(body: &Value) -> EnvelopeShape {
    match body {
        Value::Object(map) if map.contains_key("success") => EnvelopeShape::PassThrough,
        Value::Object(map)
            if ["data", "total", "skip", "take"]
                .iter()
                .all(|key| map.contains_key(*key)) =>
        {
            EnvelopeShape::Paginated
        }
        _ => EnvelopeShape::Generic,
    }
}

/// Rewrite a handler's JSON body into the success envelope
pub fn shape_body(body: Value, message: &str, timestamp: &str) -> Value {
    match (classify(&body), body) {
        (EnvelopeShape::PassThrough, body) => body,
        (EnvelopeShape::Paginated, Value::Object(mut map)) => {
            let total = int_field(&map, "total");
            let skip = int_field(&map, "skip");
            let take = int_field(&map, "take");
            let data = map.remove("data").unwrap_or(Value::Null);

            json!({
                "success": true,
                "message": message,
                "data": data,
                "pagination": PaginationMeta::new(total, skip, take),
                "timestamp": timestamp,
            })
        }
        (_, body) => json!({
            "success": true,
            "message": message,
            "data": body,
            "timestamp": timestamp,
        }),
    }
}

fn int_field(map: &Map<String, Value>, key: &str) -> i64 {
    map.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

/// Middleware that wraps successful JSON responses into the success envelope
pub async fn envelope_middleware(req: Request, next: Next) -> Response {
    let response = next.run(req).await;

    if !response.status().is_success() || !is_json(&response) {
        return response;
    }

    let message = response
        .extensions()
        .get::<ResponseMessage>()
        .map(|m| m.0)
        .unwrap_or(DEFAULT_SUCCESS_MESSAGE);

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_ENVELOPE_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to buffer response body: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                None,
            );
        }
    };

    // Handlers returning `Json(())` produce `null`
    let value: Value = if bytes.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Response declared JSON but did not parse: {}", e);
                return Response::from_parts(parts, Body::from(bytes));
            }
        }
    };

    if classify(&value) == EnvelopeShape::PassThrough {
        return Response::from_parts(parts, Body::from(bytes));
    }

    let shaped = shape_body(value, message, &timestamp_now());
    let body = match serde_json::to_vec(&shaped) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("Failed to serialize envelope: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                None,
            );
        }
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response::from_parts(parts, Body::from(body))
}

/// Fallback for unmatched routes
pub async fn not_found_fallback() -> Response {
    error_response(StatusCode::NOT_FOUND, "Route not found".to_string(), None).into_response()
}

/// Convert a caught panic into the error envelope
pub fn panic_response(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware::from_fn, routing::get, Json, Router};
    use axum_test::TestServer;

    const TS: &str = "2025-01-01T00:00:00.000Z";

    #[test]
    fn test_paginated_shape() {
        let body = json!({"data": [1, 2, 3], "total": 37, "skip": 20, "take": 10});
        let shaped = shape_body(body, "Success", TS);

        assert_eq!(
            shaped,
            json!({
                "success": true,
                "message": "Success",
                "data": [1, 2, 3],
                "pagination": {"total": 37, "page": 3, "pages": 4, "skip": 20, "take": 10},
                "timestamp": TS,
            })
        );
    }

    #[test]
    fn test_generic_shape() {
        let shaped = shape_body(json!({"id": 7}), "FAQ created", TS);
        assert_eq!(
            shaped,
            json!({"success": true, "message": "FAQ created", "data": {"id": 7}, "timestamp": TS})
        );
    }

    #[test]
    fn test_partial_pagination_keys_are_generic() {
        // Missing `take` means it's just data
        let body = json!({"data": [], "total": 3, "skip": 0});
        assert_eq!(classify(&body), EnvelopeShape::Generic);
    }

    #[test]
    fn test_already_enveloped_passes_through() {
        let body = json!({"success": true, "message": "x", "data": null});
        assert_eq!(classify(&body), EnvelopeShape::PassThrough);
        assert_eq!(shape_body(body.clone(), "Success", TS), body);
    }

    #[test]
    fn test_arrays_and_null_are_generic() {
        assert_eq!(classify(&json!([1, 2])), EnvelopeShape::Generic);
        assert_eq!(classify(&Value::Null), EnvelopeShape::Generic);
    }

    fn test_router() -> Router {
        Router::new()
            .route("/item", get(|| async { Json(json!({"id": 1})) }))
            .route(
                "/created",
                get(|| async { (ResponseMessage("Item created"), Json(json!({"id": 2}))) }),
            )
            .route(
                "/page",
                get(|| async { Json(json!({"data": ["a"], "total": 1, "skip": 0, "take": 10})) }),
            )
            .route("/file", get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], "%PDF-1.4") }))
            .route("/unit", get(|| async { Json(()) }))
            .fallback(not_found_fallback)
            .layer(from_fn(envelope_middleware))
    }

    #[tokio::test]
    async fn test_middleware_wraps_json() {
        let server = TestServer::new(test_router()).unwrap();

        let body: Value = server.get("/item").await.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Success");
        assert_eq!(body["data"]["id"], 1);

        let body: Value = server.get("/created").await.json();
        assert_eq!(body["message"], "Item created");

        let body: Value = server.get("/unit").await.json();
        assert_eq!(body["data"], Value::Null);
    }

    #[tokio::test]
    async fn test_middleware_paginates() {
        let server = TestServer::new(test_router()).unwrap();
        let body: Value = server.get("/page").await.json();

        assert_eq!(body["data"], json!(["a"]));
        assert_eq!(body["pagination"]["page"], 1);
        assert_eq!(body["pagination"]["pages"], 1);
    }

    #[tokio::test]
    async fn test_middleware_skips_files() {
        let server = TestServer::new(test_router()).unwrap();
        let response = server.get("/file").await;
        assert_eq!(response.text(), "%PDF-1.4");
    }

    #[tokio::test]
    async fn test_fallback_error_envelope_untouched() {
        let server = TestServer::new(test_router()).unwrap();
        let response = server.get("/missing").expect_failure().await;

        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["statusCode"], 404);
    }
}
