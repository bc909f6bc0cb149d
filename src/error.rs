// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::config;

/// HTTP API error with appropriate status codes and client-friendly messages.
///
/// Every handler catches its own failures and maps them here; only truly
/// unanticipated errors fall through as `Internal`, which logs the real cause
/// server-side and returns a generic message.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request (validation and business-rule violations)
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found (missing or not-owned resource)
    NotFound(String),

    // 500 Internal Server Error; detail is logged and only echoed outside production
    Internal { message: String, detail: Option<String> },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal {
            message: message.into(),
            detail: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg) => msg,
            ApiError::Internal { message, .. } => message,
        }
    }

    /// Convert to the failure envelope: `{message}`, plus `stack` outside production.
    pub fn to_json(&self) -> Value {
        let mut body = json!({ "message": self.message() });
        if !config::config().is_production() {
            if let ApiError::Internal {
                detail: Some(detail),
                ..
            } = self
            {
                body["stack"] = Value::String(detail.clone());
            }
        }
        body
    }
}

// Convert other error types to ApiError
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        // Don't expose internal SQL errors to clients
        tracing::error!("Database error: {}", err);
        ApiError::Internal {
            message: "An error occurred while processing your request".to_string(),
            detail: Some(err.to_string()),
        }
    }
}

impl From<crate::auth::JwtError> for ApiError {
    fn from(err: crate::auth::JwtError) -> Self {
        tracing::error!("Token issuance failed: {}", err);
        ApiError::Internal {
            message: "Error while logging in".to_string(),
            detail: Some(err.to_string()),
        }
    }
}

impl From<crate::db::DatabaseError> for ApiError {
    fn from(err: crate::db::DatabaseError) -> Self {
        tracing::error!("Database error: {}", err);
        ApiError::Internal {
            message: "An error occurred while processing your request".to_string(),
            detail: Some(err.to_string()),
        }
    }
}

/// Map a unique-constraint violation to a business-rule 400 with the given
/// message; anything else stays a generic 500. Used as the concurrent-writer
/// backstop behind explicit duplicate pre-checks.
pub fn on_unique_violation(err: sqlx::Error, message: &str) -> ApiError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return ApiError::bad_request(message);
        }
    }
    ApiError::from(err)
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::unauthorized("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn envelope_carries_message() {
        let body = ApiError::not_found("Report not found").to_json();
        assert_eq!(body["message"], "Report not found");
    }
}
