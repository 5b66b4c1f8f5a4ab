//! Core error types for rollcall-core.
//!
//! This module defines the error hierarchy using thiserror. The taxonomy
//! mirrors how each failure is recovered:
//!
//! - [`TimetableError::NoTimetableConfigured`] falls back to an empty schedule
//! - [`LedgerError`] surfaces as a retryable persistence failure
//! - duplicate-key conflicts on idempotent paths never leave the store layer

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Core error type for rollcall-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Timetable resolution errors
    #[error("Timetable error: {0}")]
    Timetable(#[from] TimetableError),

    /// Backing store unreachable or rejected a write
    #[error("Persistence error: {0}")]
    Persistence(#[from] LedgerError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

impl CoreError {
    /// Whether the user can retry the same action once the store is back.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Persistence(LedgerError::Unreachable(_) | LedgerError::Rejected(_))
        )
    }
}

/// Timetable resolution errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimetableError {
    /// No version has an effective-from date on or before the queried date
    #[error("No timetable configured for {date}")]
    NoTimetableConfigured { date: NaiveDate },

    /// Timetable file could not be parsed
    #[error("Failed to parse timetable: {0}")]
    Parse(String),
}

/// Attendance store errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Store could not be reached at all
    #[error("attendance store unreachable: {0}")]
    Unreachable(String),

    /// Store was reached but rejected the operation
    #[error("attendance store rejected the operation: {0}")]
    Rejected(String),

    /// Unique-key violation on (user, subject name)
    #[error("subject '{name}' already exists for user '{user_id}'")]
    DuplicateKey { user_id: String, name: String },

    /// A persisted row could not be decoded
    #[error("corrupt value '{value}' in column {field}")]
    Corrupt { field: String, value: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Two timetable versions share an effective-from date
    #[error("Duplicate timetable version effective from {effective_from}")]
    DuplicateVersion { effective_from: NaiveDate },

    /// Day key is not a weekday name
    #[error("Unknown weekday '{0}'")]
    UnknownWeekday(String),
}

impl ValidationError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => match code.code {
                rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked
                | rusqlite::ErrorCode::NotADatabase => LedgerError::Unreachable(err.to_string()),
                _ => LedgerError::Rejected(err.to_string()),
            },
            _ => LedgerError::Rejected(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for LedgerError {
    fn from(err: tokio::task::JoinError) -> Self {
        LedgerError::Unreachable(format!("store worker failed: {err}"))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_failures_are_retryable() {
        let err = CoreError::from(LedgerError::Unreachable("offline".into()));
        assert!(err.is_retryable());

        let err = CoreError::from(LedgerError::Corrupt {
            field: "status".into(),
            value: "late".into(),
        });
        assert!(!err.is_retryable());
    }

    #[test]
    fn missing_timetable_message_names_the_date() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let err = CoreError::from(TimetableError::NoTimetableConfigured { date });
        assert_eq!(
            err.to_string(),
            "Timetable error: No timetable configured for 2025-01-06"
        );
    }
}
