//! Core error types for atelier-core.
//!
//! This module defines the error hierarchy using thiserror. Placement
//! exhaustion is deliberately NOT an error: chunks the scheduler could
//! not fit ride along in `DraftOutcome::unplaced` as a warning.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for atelier-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Calendar provider errors
    #[error("Calendar error: {0}")]
    Calendar(#[from] CalendarError),

    /// Draft/timer workflow errors
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

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

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
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

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Calendar provider errors. Inside publish these are localized to the
/// chunk whose event write failed; they never abort the whole publish.
#[derive(Error, Debug)]
pub enum CalendarError {
    /// No credentials available for the provider
    #[error("Calendar not connected: {0}")]
    NotConnected(String),

    /// Transport-level failure (includes the 10s timeout)
    #[error("Calendar request failed: {0}")]
    Http(String),

    /// The provider returned an API error
    #[error("Calendar API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response was missing an expected field
    #[error("Malformed calendar response: missing {0}")]
    MissingField(&'static str),
}

/// Draft lifecycle and timer errors.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// Publish/clear was invoked with no draft in existence
    #[error("No active draft schedule")]
    NoActiveDraft,

    /// The draft changed underneath the caller (stale version stamp)
    #[error("Draft conflict: expected '{expected}', current draft is '{found}'")]
    ConcurrentDraftConflict { expected: String, found: String },

    /// A timer is already running; at most one may be active
    #[error("Timer already running: {id}")]
    TimerAlreadyRunning { id: String },

    /// Illegal time-log state transition
    #[error("Cannot {action} a {from} time log")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid time range
    #[error("Invalid time range: end ({end}) must be greater than start ({start})")]
    InvalidTimeRange {
        start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    },

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(DatabaseError::from(err))
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
