use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::shared::constants::{DEFAULT_TAKE, MAX_TAKE};

// =============================================================================
// ENVELOPES
// =============================================================================

/// Success envelope applied to every JSON response by the envelope middleware.
///
/// Handlers never build this themselves; they return plain data and the
/// middleware wraps it. The struct exists so the shape is typed in one place
/// and documented in OpenAPI.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    pub timestamp: String,
}

/// Success envelope for list endpoints returning a page of results
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
    pub timestamp: String,
}

/// Error envelope produced by `AppError` and the extractor rejections
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    /// Canonical reason phrase of the HTTP status (e.g. "Bad Request")
    pub error: String,
    pub status_code: u16,
    pub timestamp: String,
    /// Per-field validation messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub pages: i64,
    pub skip: i64,
    pub take: i64,
}

impl PaginationMeta {
    /// Derive page numbers from an offset window.
    ///
    /// `page` is 1-indexed. A zero `take` yields `pages = 0` instead of dividing by zero.
    pub fn new(total: i64, skip: i64, take: i64) -> Self {
        let (page, pages) = if take > 0 {
            (skip / take + 1, (total + take - 1) / take)
        } else {
            (1, 0)
        };

        Self {
            total,
            page,
            pages,
            skip,
            take,
        }
    }
}

/// Page of results returned by services and handlers.
///
/// Serializes to `{data, total, skip, take}`, which the envelope middleware
/// recognises and turns into a paginated envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub skip: i64,
    pub take: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, skip: i64, take: i64) -> Self {
        Self {
            data,
            total,
            skip,
            take,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            skip: self.skip,
            take: self.take,
        }
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

pub fn default_skip() -> i64 {
    0
}

pub fn default_take() -> i64 {
    DEFAULT_TAKE
}

/// Offset pagination query parameters (`?skip=20&take=10`).
#[derive(Debug, Clone, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    /// Number of items to skip (default: 0)
    #[serde(default = "default_skip")]
    #[validate(range(min = 0, message = "skip must not be negative"))]
    #[param(minimum = 0)]
    pub skip: i64,

    /// Number of items to return (default: 10, max: 100)
    #[serde(default = "default_take")]
    #[validate(range(min = 1, max = 100, message = "take must be between 1 and 100"))]
    #[param(minimum = 1, maximum = 100)]
    pub take: i64,
}

impl Default for PaginationQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            take: DEFAULT_TAKE,
        }
    }
}

impl PaginationQuery {
    /// SQL OFFSET
    pub fn offset(&self) -> i64 {
        self.skip.max(0)
    }

    /// SQL LIMIT, clamped to MAX_TAKE
    pub fn limit(&self) -> i64 {
        self.take.clamp(1, MAX_TAKE)
    }
}
