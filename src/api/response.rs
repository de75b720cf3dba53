//! Response types for the exeat engine API.
//!
//! Decisions and command outcomes are returned as-is; this module covers
//! the error body used when a request cannot be processed at all.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, StoreError};

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }

    /// No approved leave covers the requested departure.
    pub fn no_active_leave(admin_number: &str) -> Self {
        Self::with_details(
            "NO_ACTIVE_LEAVE",
            format!("No approved leave is active for student {}", admin_number),
            "Departures can only be logged inside an approved, not yet departed leave window",
        )
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let code = error.reason_code();
        let text = error.to_string();
        match error {
            EngineError::AuthenticationFailure { .. } => ApiErrorResponse {
                status: StatusCode::UNAUTHORIZED,
                error: ApiError::new(code.as_str().to_uppercase(), text),
            },
            EngineError::LinkageFailure { .. }
            | EngineError::ParseFailure { .. }
            | EngineError::PolicyViolation { .. }
            | EngineError::InvalidWindow { .. } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::new(code.as_str().to_uppercase(), text),
            },
            EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::InvalidSetting { .. }
            | EngineError::Telemetry { .. }
            | EngineError::Io(_) => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details("CONFIG_ERROR", "Configuration error", text),
            },
            EngineError::PersistenceFailure { message } => ApiErrorResponse {
                status: StatusCode::SERVICE_UNAVAILABLE,
                error: ApiError::with_details(
                    "PERSISTENCE_ERROR",
                    "The leave register is unavailable",
                    message,
                ),
            },
        }
    }
}

impl From<StoreError> for ApiErrorResponse {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UnknownSubject(admin_number) => ApiErrorResponse {
                status: StatusCode::NOT_FOUND,
                error: ApiError::new(
                    "STUDENT_NOT_FOUND",
                    format!("No student with admin number {}", admin_number),
                ),
            },
            other => EngineError::from(other).into(),
        }
    }
}
