//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Postgres SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error code.
///
/// # Error Categories
///
/// - **Tenant resolution**: unknown tenant, missing or mismatched `homeID`
/// - **Authentication**: bad credentials, invalid or foreign session tokens
/// - **Authorization**: resident calling an admin operation
/// - **Resource**: requested row not found in the tenant schema
/// - **Business rules**: event capacity, duplicates
/// - **Infrastructure**: database, object storage, upstream HTTP
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Path names a tenant that does not exist or was deactivated.
    #[error("Tenant not found")]
    TenantNotFound,

    /// The `homeID` header is absent.
    #[error("Missing homeID header")]
    MissingHomeId,

    /// The `homeID` header is not a valid tenant id.
    #[error("Invalid homeID header")]
    InvalidHomeId,

    /// The `homeID` header names a different tenant than the path.
    #[error("homeID does not match tenant")]
    TenantMismatch,

    /// Username or password did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Session token is missing, malformed, expired, or issued for another tenant.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Platform API key is missing, invalid, or inactive.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Authenticated, but the role does not allow the operation.
    #[error("Operation not permitted")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    #[error("Event not found")]
    EventNotFound,

    #[error("Notification not found")]
    NotificationNotFound,

    /// Joining would exceed `max_participants`.
    #[error("Event is full")]
    EventFull,

    /// The request conflicts with existing state (duplicate key, already joined).
    #[error("{0}")]
    Conflict(String),

    /// Request body or parameters are invalid.
    ///
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Request body larger than the configured limit, in bytes.
    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Phone login requested but Firebase is not configured.
    #[error("Phone authentication is not configured")]
    PhoneAuthUnavailable,

    /// Object storage write failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Password hashing failed or its blocking task died.
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// Session token could not be signed.
    #[error("Token signing error: {0}")]
    Signing(jsonwebtoken::errors::Error),

    /// An upstream HTTP call (Firebase keys, storage, push gateway) failed.
    #[error("Upstream error: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// Unique violations become `Conflict`; everything else stays a database error.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return AppError::Conflict("Resource already exists".to_string());
            }
        }
        AppError::Database(err)
    }
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::TenantNotFound => (StatusCode::NOT_FOUND, "tenant_not_found"),
            AppError::MissingHomeId => (StatusCode::BAD_REQUEST, "missing_home_id"),
            AppError::InvalidHomeId => (StatusCode::BAD_REQUEST, "invalid_home_id"),
            AppError::TenantMismatch => (StatusCode::BAD_REQUEST, "tenant_mismatch"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AppError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "invalid_api_key"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "user_not_found"),
            AppError::EventNotFound => (StatusCode::NOT_FOUND, "event_not_found"),
            AppError::NotificationNotFound => (StatusCode::NOT_FOUND, "notification_not_found"),
            AppError::EventFull => (StatusCode::CONFLICT, "event_full"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            AppError::PhoneAuthUnavailable => {
                (StatusCode::NOT_IMPLEMENTED, "phone_auth_unavailable")
            }
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::PasswordHash(_)
            | AppError::Signing(_)
            | AppError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// Infrastructure failures are logged and reported as `internal_error`
/// without their details.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match self {
            AppError::InvalidRequest(ref msg) | AppError::Conflict(ref msg) => msg.clone(),
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::PasswordHash(_)
            | AppError::Signing(_)
            | AppError::Upstream(_) => {
                tracing::error!(error = %self, "request failed");
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
