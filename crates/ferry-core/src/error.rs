//! Error types for ferry.

use thiserror::Error;

/// Result type alias using ferry's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ferry operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Content store operation failed
    #[error("Store error: {0}")]
    Store(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Content type is not declared in the schema registry
    #[error("Unknown content type: {0}")]
    UnknownContentType(String),

    /// Fragment schema is not declared in the schema registry
    #[error("Unknown fragment: {0}")]
    UnknownFragment(String),

    /// Manifest missing, corrupt, or violating an invariant
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Archive could not be read, written, or extracted
    #[error("Archive error: {0}")]
    Archive(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The store rejected a write (validation failure)
    #[error("Validation error: {0}")]
    Validation(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("entry p1".to_string());
        assert_eq!(err.to_string(), "Not found: entry p1");
    }

    #[test]
    fn test_error_display_unknown_content_type() {
        let err = Error::UnknownContentType("post".to_string());
        assert_eq!(err.to_string(), "Unknown content type: post");
    }

    #[test]
    fn test_error_display_manifest() {
        let err = Error::Manifest("data.json missing".to_string());
        assert_eq!(err.to_string(), "Manifest error: data.json missing");
    }

    #[test]
    fn test_error_display_archive() {
        let err = Error::Archive("truncated gzip stream".to_string());
        assert_eq!(err.to_string(), "Archive error: truncated gzip stream");
    }

    #[test]
    fn test_error_display_validation() {
        let err = Error::Validation("title required".to_string());
        assert_eq!(err.to_string(), "Validation error: title required");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
