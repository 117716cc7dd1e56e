//! Error types for the clipper service.

use thiserror::Error;

/// Result type alias using clipper's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for clipper operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage backend read or write failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Read-modify-write kept conflicting until the attempt bound was reached
    #[error("Store write exhausted for key '{key}' after {attempts} attempts")]
    StoreWriteExhausted { key: String, attempts: u32 },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Clip not found
    #[error("Clip not found: {0}")]
    ClipNotFound(String),

    /// Project not found
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// Remote annotation call failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Remote annotation body could not be parsed
    #[error("Annotation parse error: {0}")]
    AnnotationParse(String),

    /// Selection could not be read from the browsing context
    #[error("Selection error: {0}")]
    Selection(String),

    /// Trigger surface already holds an entry with this id
    #[error("Menu entry already exists: {0}")]
    DuplicateMenuEntry(String),

    /// Trigger surface operation failed
    #[error("Menu error: {0}")]
    Menu(String),

    /// Audit mirror rejected or failed the append
    #[error("Audit error: {0}")]
    Audit(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

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

impl Error {
    /// True for errors that a retry or degraded path may recover from.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Storage(_) | Error::Request(_) | Error::Inference(_) | Error::Io(_)
        )
    }
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
    fn test_error_display_store_write_exhausted() {
        let err = Error::StoreWriteExhausted {
            key: "clips".to_string(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "Store write exhausted for key 'clips' after 3 attempts"
        );
    }

    #[test]
    fn test_error_display_duplicate_menu_entry() {
        let err = Error::DuplicateMenuEntry("save_quick".to_string());
        assert_eq!(err.to_string(), "Menu entry already exists: save_quick");
    }

    #[test]
    fn test_error_display_annotation_parse() {
        let err = Error::AnnotationParse("no object found".to_string());
        assert_eq!(err.to_string(), "Annotation parse error: no object found");
    }

    #[test]
    fn test_error_display_clip_not_found() {
        let err = Error::ClipNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Clip not found: abc");
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
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Storage("busy".into()).is_transient());
        assert!(Error::Request("timeout".into()).is_transient());
        assert!(!Error::StoreWriteExhausted {
            key: "clips".into(),
            attempts: 3
        }
        .is_transient());
        assert!(!Error::DuplicateMenuEntry("x".into()).is_transient());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
