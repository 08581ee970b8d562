//! Error types for the bookstore catalog

use thiserror::Error;

/// Result type alias using the catalog's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the catalog
#[derive(Error, Debug)]
pub enum Error {
    /// The store could not be reached or refused the session
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store rejected a query, update, delete, aggregate or index call
    #[error("{operation} failed: {message}")]
    Operation {
        operation: &'static str,
        message: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Build an operation failure for the named store call
    pub fn operation(operation: &'static str, message: impl Into<String>) -> Self {
        Error::Operation {
            operation,
            message: message.into(),
        }
    }

    /// Whether the error means the store itself is unreachable
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_display() {
        let err = Error::operation("find", "bad filter");
        assert_eq!(err.to_string(), "find failed: bad filter");
        assert!(!err.is_connection());
    }

    #[test]
    fn test_connection_error_is_connection() {
        let err = Error::Connection("no route to host".to_string());
        assert!(err.is_connection());
        assert_eq!(err.to_string(), "Connection error: no route to host");
    }
}
