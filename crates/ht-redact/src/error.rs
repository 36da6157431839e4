//! Classifier input errors.

use thiserror::Error;

/// Rejection of a classification request.
///
/// Fatal to the single call only; callers drop or skip the offending
/// observation and keep the pipeline running.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyError {
    /// Header names are required; an unnamed header cannot be keyed.
    #[error("header name is required")]
    MissingName,
}
