//! Error types for Wisdom
//!
//! Query construction problems are recoverable and mostly repaired in place by
//! the builders; data-access problems always surface to the caller.

use thiserror::Error;

/// The main error type for Wisdom operations
#[derive(Error, Debug)]
pub enum Error {
    // ========== Query Errors ==========
    #[error("Malformed query: {0}")]
    MalformedQuery(String),

    // ========== Lookup Errors ==========
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Unknown database: {0}")]
    UnknownDatabase(String),

    // ========== Pagination Errors ==========
    #[error("Invalid pagination state: {0}")]
    InvalidPaginationState(String),

    #[error("Fetch aborted")]
    Aborted,

    // ========== Backing Store Errors ==========
    #[error("Backing store failure: {0}")]
    BackingStore(String),

    // ========== Serialization Errors ==========
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ========== IO Errors ==========
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========== Configuration Errors ==========
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ========== Validation Errors ==========
    #[error("Validation error: {0}")]
    Validation(String),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Wisdom operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if the error names something that does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::UnknownTable(_) | Error::UnknownDatabase(_))
    }

    /// Returns true if the caller sent input the engine cannot act on
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedQuery(_) | Error::InvalidPaginationState(_) | Error::Validation(_)
        )
    }

    /// Returns true if retrying the same call may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Aborted | Error::BackingStore(_) | Error::Io(_))
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedQuery(_) => "malformed_query",
            Error::UnknownTable(_) => "unknown_table",
            Error::UnknownDatabase(_) => "unknown_database",
            Error::InvalidPaginationState(_) => "invalid_pagination_state",
            Error::Aborted => "aborted",
            Error::BackingStore(_) => "backing_store_failure",
            Error::Deserialization(_) => "deserialization",
            Error::Io(_) => "io",
            Error::Configuration(_) => "configuration",
            Error::Validation(_) => "validation",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Deserialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownTable("t99".to_string());
        assert_eq!(err.to_string(), "Unknown table: t99");
        assert_eq!(Error::Aborted.to_string(), "Fetch aborted");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::UnknownDatabase("db9".to_string()).is_not_found());
        assert!(!Error::BackingStore("down".to_string()).is_not_found());

        assert!(Error::MalformedQuery("x".to_string()).is_client_error());
        assert!(Error::InvalidPaginationState("x".to_string()).is_client_error());
        assert!(!Error::UnknownTable("t1".to_string()).is_client_error());

        assert!(Error::BackingStore("timeout".to_string()).is_recoverable());
        assert!(!Error::Validation("x".to_string()).is_recoverable());
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::Aborted.kind(), "aborted");
        assert_eq!(
            Error::BackingStore("x".to_string()).kind(),
            "backing_store_failure"
        );
    }

    #[test]
    fn test_json_errors_are_deserialization() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Deserialization(_)));
        assert_eq!(err.kind(), "deserialization");
    }
}
