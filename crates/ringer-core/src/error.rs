//! Unified error handling for the Ringer trunk platform
//!
//! This module provides a single error type that covers every failure
//! scenario of the trunk tooling, with automatic HTTP response mapping.
//! Field-level validation problems are not errors: they are returned as
//! data by the validators and only become `AppError::Validation` when a
//! caller tries to submit an invalid trunk.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Generic message shown when the platform did not provide one
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Authentication Errors ====================
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Session expired, please sign in again")]
    SessionExpired,

    // ==================== Business Logic Errors ====================
    #[error("Trunk not found: {0}")]
    TrunkNotFound(String),

    #[error("No rate configured for zone {0}")]
    RateNotFound(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Trunk type cannot change after creation: {0}")]
    ImmutableTrunkType(String),

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    // ==================== Platform API Errors ====================
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Platform API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Platform API timed out after {0}s")]
    Timeout(u64),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_)
            | AppError::InvalidInput(_)
            | AppError::ImmutableTrunkType(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized(_)
            | AppError::InvalidToken(_)
            | AppError::SessionExpired => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            AppError::TrunkNotFound(_) | AppError::RateNotFound(_) | AppError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }

            // 409 Conflict
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,

            // Upstream failures
            // A failure never goes out as a success status
            AppError::Api { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &str {
        match self {
            AppError::Unauthorized(_) => "unauthorized",
            AppError::InvalidToken(_) => "invalid_token",
            AppError::SessionExpired => "session_expired",
            AppError::TrunkNotFound(_) => "trunk_not_found",
            AppError::RateNotFound(_) => "rate_not_found",
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::ImmutableTrunkType(_) => "immutable_trunk_type",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound(_) => "not_found",
            AppError::Http(_) => "http_error",
            AppError::Api { code, .. } => code.as_str(),
            AppError::Timeout(_) => "timeout",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }

    /// Message suitable for a toast or banner
    ///
    /// Uses the platform-provided message when there is one, and a generic
    /// fallback for transport and internal failures.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            AppError::Api { .. }
            | AppError::Http(_)
            | AppError::Internal(_)
            | AppError::Serialization(_)
            | AppError::Config(_) => GENERIC_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Not-found and invalid-state errors get a dedicated page, not a toast
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::TrunkNotFound(_) | AppError::NotFound(_) | AppError::RateNotFound(_)
        ) || matches!(self, AppError::Api { status: 404, .. })
    }

    /// Whether an idempotent read may be retried after this error
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Http(_) | AppError::Timeout(_) => true,
            AppError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.user_message(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Serialization(err.to_string())
        } else {
            AppError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::SessionExpired.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::TrunkNotFound("cust-trunk-001".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InvalidTransition {
                from: "active".to_string(),
                to: "active".to_string()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Api {
                status: 503,
                code: "unavailable".to_string(),
                message: String::new()
            }
            .status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Api {
                status: 200,
                code: "request_failed".to_string(),
                message: String::new()
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::SessionExpired.error_code(), "session_expired");
        assert_eq!(
            AppError::ImmutableTrunkType("cust-trunk-001".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Api {
                status: 422,
                code: "TRUNK_LOCKED".to_string(),
                message: "locked".to_string()
            }
            .error_code(),
            "TRUNK_LOCKED"
        );
    }

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = AppError::Api {
            status: 400,
            code: "bad_request".to_string(),
            message: "BAN is not active".to_string(),
        };
        assert_eq!(err.user_message(), "BAN is not active");

        let err = AppError::Api {
            status: 500,
            code: "internal".to_string(),
            message: "  ".to_string(),
        };
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);

        assert_eq!(
            AppError::Http("connection reset".to_string()).user_message(),
            GENERIC_ERROR_MESSAGE
        );
    }

    #[test]
    fn test_retryable_and_not_found_classification() {
        assert!(AppError::Timeout(30).is_retryable());
        assert!(AppError::Api {
            status: 502,
            code: "bad_gateway".to_string(),
            message: String::new()
        }
        .is_retryable());
        assert!(!AppError::Validation("x".to_string()).is_retryable());
        assert!(!AppError::SessionExpired.is_retryable());
        assert!(AppError::Api {
            status: 404,
            code: "not_found".to_string(),
            message: String::new()
        }
        .is_not_found());
    }
}
