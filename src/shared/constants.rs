/// Default number of items returned by list endpoints
pub const DEFAULT_TAKE: i64 = 10;

/// Maximum number of items a client may request per page
pub const MAX_TAKE: i64 = 100;

/// Message used in the success envelope when a handler does not set one
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Success";

// =============================================================================
// ROLE CONSTANTS
// =============================================================================

/// Back-office administrator - full access including user management
pub const ROLE_ADMIN: &str = "admin";

/// Operator - processes service requests, reviews documents, runs appointments
pub const ROLE_OPERATOR: &str = "operator";

/// Customer - initiates service requests, pays, uploads documents
pub const ROLE_CUSTOMER: &str = "customer";

// =============================================================================
// DOCUMENT UPLOADS
// =============================================================================

/// Maximum document size in bytes (15MB)
pub const MAX_FILE_SIZE: i64 = 15 * 1024 * 1024;

/// MIME types accepted for document uploads when a requirement does not narrow them
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/webp",
];
