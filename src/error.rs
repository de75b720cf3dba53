//! Error types for the exeat engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate.
//! [`EngineError`] covers everything the engine and its configuration layer
//! can fail with; [`StoreError`] is what policy store backends report before
//! it is folded into [`EngineError::PersistenceFailure`].

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::ReasonCode;

/// The main error type for the exeat engine.
///
/// # Example
///
/// ```
/// use exeat_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/calendar.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/calendar.yaml");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// An environment setting had an unusable value.
    #[error("Invalid setting {name}: {message}")]
    InvalidSetting {
        /// The environment variable name.
        name: String,
        /// What was wrong with it.
        message: String,
    },

    /// The tracing subscriber could not be installed.
    #[error("Failed to initialise telemetry: {message}")]
    Telemetry {
        /// Underlying error text.
        message: String,
    },

    /// The sender's contact did not match any known guardian or administrator.
    #[error("No account is registered for {contact}")]
    AuthenticationFailure {
        /// The phone number or email that failed.
        contact: String,
    },

    /// The identifier did not resolve to a student linked to the sender.
    #[error("No student matching '{identifier}' is linked to this account")]
    LinkageFailure {
        /// The identifier extracted from the message.
        identifier: String,
    },

    /// A required field could not be extracted from free text.
    #[error("Could not determine the {missing} from the message")]
    ParseFailure {
        /// Which field was missing.
        missing: &'static str,
    },

    /// A policy rule rejected the request.
    #[error("Policy violation ({code}): {reason}")]
    PolicyViolation {
        /// Machine-readable code.
        code: ReasonCode,
        /// Human-readable reason.
        reason: String,
    },

    /// The policy store failed.
    #[error("Persistence failure: {message}")]
    PersistenceFailure {
        /// Underlying error text.
        message: String,
    },

    /// Socket or stream failure while serving or printing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A window whose start is not before its end.
    #[error("Invalid window: {start} is not before {end}")]
    InvalidWindow {
        /// Requested start.
        start: NaiveDateTime,
        /// Requested end.
        end: NaiveDateTime,
    },
}

impl EngineError {
    /// The reason code a decision should carry for this error.
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            EngineError::AuthenticationFailure { .. } => ReasonCode::AuthenticationFailed,
            EngineError::LinkageFailure { .. } => ReasonCode::StudentLinkageFailed,
            EngineError::ParseFailure { missing } if *missing == "dates" => ReasonCode::MissingDates,
            EngineError::ParseFailure { .. } => ReasonCode::ParseFailed,
            EngineError::PolicyViolation { code, .. } => *code,
            EngineError::InvalidWindow { .. } => ReasonCode::DateInvalid,
            EngineError::ConfigNotFound { .. }
            | EngineError::ConfigParseError { .. }
            | EngineError::InvalidSetting { .. }
            | EngineError::Telemetry { .. }
            | EngineError::Io(_)
            | EngineError::PersistenceFailure { .. } => ReasonCode::PersistenceFailed,
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by policy store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached, e.g. a poisoned lock.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// SQLite reported an error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// A write referenced a student the store does not know.
    #[error("unknown student {0}")]
    UnknownSubject(String),
}

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        EngineError::PersistenceFailure {
            message: error.to_string(),
        }
    }
}

/// A type alias for Results that return StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
