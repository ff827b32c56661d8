//! Error types and the error response body

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// Every handler returns this on failure. It carries:
/// - A standardized error code via [`ErrorCode`]
/// - A human-readable message
/// - Optional structured details (offending field, current status, ...)
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// The error code identifying the type of error
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details (field-level errors, context, etc.)
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // ==================== Convenience constructors ====================

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Create a required-field error naming the field
    pub fn required(field: &str) -> Self {
        Self::with_message(ErrorCode::RequiredField, format!("{} is required", field))
            .with_detail("field", field)
    }

    /// Create a not found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    /// Create a not authenticated error
    pub fn not_authenticated() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    /// Create a permission denied error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PermissionDenied, msg)
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::DatabaseError, msg)
    }

    /// Create an invalid token error
    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::TokenInvalid, msg)
    }

    /// Create a token expired error
    pub fn token_expired() -> Self {
        Self::new(ErrorCode::TokenExpired)
    }

    /// Create an invalid credentials error
    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials)
    }

    /// Create an order conflict error (stale read during a transition)
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::OrderStatusConflict, msg)
    }

    /// Message safe to return to clients.
    ///
    /// System errors only expose the default message for their code; the
    /// internal message stays in the server log.
    pub fn public_message(&self) -> &str {
        if self.code.category() == ErrorCategory::System {
            self.code.message()
        } else {
            &self.message
        }
    }
}

/// Error body returned by every failing endpoint
///
/// `{"error": "...", "code": 4008, "details": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message
    pub error: String,
    /// Numeric error code
    pub code: u16,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        let is_system = err.code.category() == ErrorCategory::System;
        Self {
            error: err.public_message().to_string(),
            code: err.code.code(),
            details: if is_system { None } else { err.details.clone() },
        }
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ErrorBody::from(&self);

        // Log system errors with the internal message
        if self.code.category() == ErrorCategory::System {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "System error occurred"
            );
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new() {
        let err = AppError::new(ErrorCode::OrderNotFound);
        assert_eq!(err.code, ErrorCode::OrderNotFound);
        assert_eq!(err.message, "Order not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_app_error_with_detail() {
        let err = AppError::new(ErrorCode::OrderInvalidTransition)
            .with_detail("status", "placed")
            .with_detail("action", "pack");

        let details = err.details.unwrap();
        assert_eq!(details.get("status").unwrap(), "placed");
        assert_eq!(details.get("action").unwrap(), "pack");
    }

    #[test]
    fn test_app_error_convenience_constructors() {
        let err = AppError::not_found("Medicine");
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Medicine not found");

        let err = AppError::required("deliveryAddress");
        assert_eq!(err.code, ErrorCode::RequiredField);
        assert_eq!(err.message, "deliveryAddress is required");

        let err = AppError::forbidden("Pharmacists only");
        assert_eq!(err.http_status(), StatusCode::FORBIDDEN);

        let err = AppError::conflict("stale");
        assert_eq!(err.http_status(), StatusCode::CONFLICT);

        assert_eq!(
            AppError::not_authenticated().http_status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_error_body_hides_system_message() {
        let err = AppError::database("connection refused on 10.0.0.5:5432")
            .with_detail("host", "10.0.0.5");
        let body = ErrorBody::from(&err);

        assert_eq!(body.code, 9002);
        assert_eq!(body.error, "Database error");
        assert!(body.details.is_none());
    }

    #[test]
    fn test_error_body_keeps_client_message() {
        let err = AppError::new(ErrorCode::InvalidOtp).with_detail("digits", 2);
        let body = ErrorBody::from(&err);

        assert_eq!(body.code, 4010);
        assert_eq!(body.error, "Delivery OTP must be exactly 4 digits");
        assert_eq!(body.details.unwrap().get("digits").unwrap(), 2);
    }

    #[test]
    fn test_error_body_serialize() {
        let body = ErrorBody::from(&AppError::validation("bad input"));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "bad input");
        assert_eq!(json["code"], 2);
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::with_message(ErrorCode::OrderNotFound, "Order abc not found");
        assert_eq!(format!("{}", err), "Order abc not found");
    }
}
