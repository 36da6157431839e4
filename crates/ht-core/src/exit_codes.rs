//! Exit codes for the ht-core CLI.
//!
//! A stable contract for automation:
//! - 0: success (a retained upload still counts — at-least-once is the
//!   delivery model, not a failure)
//! - 1: operational failure (storage, I/O)
//! - 10: invalid usage or configuration
//! - 20: internal error

use ht_common::{Error, ErrorCategory};

/// Exit codes for ht-core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    OperationFailed = 1,
    InvalidUsage = 10,
    Internal = 20,
}

impl ExitCode {
    /// Map a pipeline error to its exit code.
    pub fn from_error(error: &Error) -> Self {
        match error.category() {
            ErrorCategory::Classification => ExitCode::InvalidUsage,
            ErrorCategory::Storage => ExitCode::OperationFailed,
            ErrorCategory::Upload => match error {
                Error::InvalidEndpoint { .. } | Error::InvalidFrequency { .. } => {
                    ExitCode::InvalidUsage
                }
                _ => ExitCode::OperationFailed,
            },
            ErrorCategory::Collector => ExitCode::OperationFailed,
            ErrorCategory::Io => ExitCode::OperationFailed,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            ExitCode::from_error(&Error::InvalidFrequency { minutes: 0 }),
            ExitCode::InvalidUsage
        );
        assert_eq!(
            ExitCode::from_error(&Error::UploadServer { status: 500 }),
            ExitCode::OperationFailed
        );
        assert_eq!(
            ExitCode::from_error(&Error::StorageWrite {
                key: "aggregatedStats".into(),
                reason: "disk full".into()
            }),
            ExitCode::OperationFailed
        );
    }
}
