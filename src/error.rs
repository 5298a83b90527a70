// src/error.rs
// Standardized error types for mailroom

use thiserror::Error;

/// Main error type for the mailroom library.
///
/// Pipeline-level failures never appear here: backend and parse failures are
/// absorbed into decisions, and configuration gaps surface as `RunFailure`
/// values inside the classification result. This enum covers infrastructure
/// trouble only.
#[derive(Error, Debug)]
pub enum MailroomError {
    #[error("invalid taxonomy data: {0}")]
    InvalidCategory(String),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unknown error: {0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Convenience type alias for Result using MailroomError
pub type Result<T> = std::result::Result<T, MailroomError>;

impl From<String> for MailroomError {
    fn from(s: String) -> Self {
        MailroomError::Other(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_category_error() {
        let err = MailroomError::InvalidCategory("thresholds out of range".to_string());
        assert!(err.to_string().contains("invalid taxonomy data"));
    }

    #[test]
    fn test_from_string() {
        let err: MailroomError = "some error".to_string().into();
        assert!(matches!(err, MailroomError::Other(_)));
        assert!(err.to_string().contains("some error"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<i32>("not json").unwrap_err();
        let err: MailroomError = json_err.into();
        assert!(matches!(err, MailroomError::Json(_)));
        assert!(err.to_string().contains("JSON"));
    }
}
