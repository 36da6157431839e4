//! Error types for the header statistics pipeline.
//!
//! Structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for callers that retry

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for headertrack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Classifier input errors (missing header name).
    Classification,
    /// Persistent store read/write failures.
    Storage,
    /// Upload transport and collector response errors.
    Upload,
    /// Collector-side ingestion errors.
    Collector,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Classification => write!(f, "classification"),
            ErrorCategory::Storage => write!(f, "storage"),
            ErrorCategory::Upload => write!(f, "upload"),
            ErrorCategory::Collector => write!(f, "collector"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for the header statistics pipeline.
#[derive(Error, Debug)]
pub enum Error {
    // Classification errors (10-19)
    #[error("header name is required")]
    MissingHeaderName,

    // Storage errors (20-29)
    #[error("storage read failed for key '{key}': {reason}")]
    StorageRead { key: String, reason: String },

    #[error("storage write failed for key '{key}': {reason}")]
    StorageWrite { key: String, reason: String },

    // Upload errors (30-39)
    #[error("upload transport failed: {0}")]
    UploadTransport(String),

    #[error("collector responded with status {status}")]
    UploadServer { status: u16 },

    #[error("invalid collector endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("upload frequency must be at least 1 minute, got {minutes}")]
    InvalidFrequency { minutes: u64 },

    // Collector errors (40-49)
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error type.
    ///
    /// Codes are grouped by category:
    /// - 10-19: Classification errors
    /// - 20-29: Storage errors
    /// - 30-39: Upload errors
    /// - 40-49: Collector errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::MissingHeaderName => 10,
            Error::StorageRead { .. } => 20,
            Error::StorageWrite { .. } => 21,
            Error::UploadTransport(_) => 30,
            Error::UploadServer { .. } => 31,
            Error::InvalidEndpoint { .. } => 32,
            Error::InvalidFrequency { .. } => 33,
            Error::MalformedPayload(_) => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::MissingHeaderName => ErrorCategory::Classification,
            Error::StorageRead { .. } | Error::StorageWrite { .. } => ErrorCategory::Storage,
            Error::UploadTransport(_)
            | Error::UploadServer { .. }
            | Error::InvalidEndpoint { .. }
            | Error::InvalidFrequency { .. } => ErrorCategory::Upload,
            Error::MalformedPayload(_) => ErrorCategory::Collector,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Upload failures recover naturally: the persisted table is retained
    /// and the next scheduler cycle resends the accumulated aggregate.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // The single observation is dropped; the pipeline continues.
            Error::MissingHeaderName => true,

            // Transient; the pending buffer of the next cycle still flushes.
            Error::StorageRead { .. } => true,
            Error::StorageWrite { .. } => true,

            // Natural retry on the next tick.
            Error::UploadTransport(_) => true,
            Error::UploadServer { .. } => true,

            // User must fix the setting.
            Error::InvalidEndpoint { .. } => false,
            Error::InvalidFrequency { .. } => false,

            // Sender bug; no server state change.
            Error::MalformedPayload(_) => false,

            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(Error::MissingHeaderName.code(), 10);
        assert_eq!(
            Error::StorageWrite {
                key: "aggregatedStats".into(),
                reason: "disk full".into()
            }
            .code(),
            21
        );
        assert_eq!(Error::UploadServer { status: 500 }.code(), 31);
        assert_eq!(Error::MalformedPayload("stats missing".into()).code(), 40);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            Error::MissingHeaderName.category(),
            ErrorCategory::Classification
        );
        assert_eq!(
            Error::UploadTransport("connection refused".into()).category(),
            ErrorCategory::Upload
        );
        assert_eq!(
            Error::MalformedPayload("not an array".into()).category(),
            ErrorCategory::Collector
        );
    }

    #[test]
    fn test_error_recoverable() {
        assert!(Error::UploadServer { status: 503 }.is_recoverable());
        assert!(Error::StorageRead {
            key: "aggregatedStats".into(),
            reason: "corrupt".into()
        }
        .is_recoverable());
        assert!(!Error::InvalidEndpoint {
            url: "not a url".into(),
            reason: "relative URL without a base".into()
        }
        .is_recoverable());
        assert!(!Error::MalformedPayload("stats missing".into()).is_recoverable());
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Storage.to_string(), "storage");
        assert_eq!(ErrorCategory::Upload.to_string(), "upload");
    }
}
