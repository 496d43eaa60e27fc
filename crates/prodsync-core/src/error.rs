//! Error types for the product sync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the product sync system
#[derive(Error, Debug)]
pub enum Error {
    /// Record store failure (read, stage or commit)
    #[error("Record store error: {0}")]
    Store(String),

    /// Record store could not be reached (connection refused, session not opened)
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    /// Commit rejected by a store constraint
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Operation exceeded its time budget
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Operation attempted in an invalid state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Operation was cancelled before completion
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input failed validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Filesystem / OS level errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a record store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a store-unavailable error
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a constraint violation error
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an invalid operation error
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Whether the retry policy may re-run the operation that produced this error
    ///
    /// Network-, timeout- and invalid-operation-style failures are transient.
    /// Everything else (constraint violations, bad configuration, validation,
    /// cancellation) fails the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::Timeout(_) | Self::InvalidOperation(_) | Self::Io(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(Error::store_unavailable("connection refused").is_transient());
        assert!(Error::timeout("fetch").is_transient());
        assert!(Error::invalid_operation("session closed").is_transient());
        assert!(Error::Io(std::io::Error::other("reset")).is_transient());

        assert!(!Error::store("disk full").is_transient());
        assert!(!Error::constraint("duplicate id").is_transient());
        assert!(!Error::cancelled("shutdown").is_transient());
        assert!(!Error::config("bad interval").is_transient());
    }
}
