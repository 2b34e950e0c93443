//! Error types for the furever archive subsystem.

use thiserror::Error;

/// Result type alias using furever's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for archive operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Record absent from the table the operation expected it in
    #[error("Not found: {0}")]
    NotFound(String),

    /// A business rule blocks the transition (e.g. dependent active records exist)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// True for failures caused by the store rather than by business rules.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("tbl_pet 7".to_string());
        assert_eq!(err.to_string(), "Not found: tbl_pet 7");
    }

    #[test]
    fn test_error_display_precondition() {
        let err = Error::Precondition("pet owner 3 has 2 active pets".to_string());
        assert_eq!(
            err.to_string(),
            "Precondition failed: pet owner 3 has 2 active pets"
        );
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("unknown entity 'cat'".to_string());
        assert_eq!(err.to_string(), "Invalid input: unknown entity 'cat'");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("bad retention window".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad retention window");
    }

    #[test]
    fn test_error_display_internal() {
        let err = Error::Internal("unexpected state".to_string());
        assert_eq!(err.to_string(), "Internal error: unexpected state");
    }

    #[test]
    fn test_from_sqlx_error_is_storage() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(err.is_storage());
        assert!(err.to_string().starts_with("Database error:"));
    }

    #[test]
    fn test_business_errors_are_not_storage() {
        assert!(!Error::NotFound("x".into()).is_storage());
        assert!(!Error::Precondition("x".into()).is_storage());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
