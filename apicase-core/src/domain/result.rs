//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Constraint variants carry the engine's message; they are raised by the
/// database, never pre-checked in Rust.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("NOT NULL constraint violation: {0}")]
    NotNullViolation(String),

    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors the engine raised to enforce a schema constraint
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::UniqueViolation(_) | Error::NotNullViolation(_) | Error::ForeignKeyViolation(_)
        )
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Database(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
