//! Headertrack shared types.
//!
//! This crate provides:
//! - The header statistics data model (directions, stat entries, tables)
//! - Fingerprint derivation and the count-sum merge rule
//! - The unified error taxonomy for the pipeline

pub mod error;
pub mod stats;

pub use error::{Error, ErrorCategory, Result};
pub use stats::{
    fingerprint, merge_entries, sorted_by_count, AggregatedTable, Direction, StatEntry,
    UploadPayload,
};

/// Marker substituted for header values the classifier refuses to retain.
///
/// Once a value is replaced by this marker it is the only form that ever
/// reaches a fingerprint, a buffer, storage, or the wire.
pub const REDACTION_MARKER: &str = "(anonymized)";

/// Schema version for persisted tables and upload payloads.
pub const SCHEMA_VERSION: &str = "1.0.0";
