//! Header secrecy classification.
//!
//! Decides whether an observed HTTP header value must be redacted before it
//! is fingerprinted, buffered, or stored. The classifier is a fixed,
//! ordered list of predicate rules over a typed header candidate: a closed
//! set of unconditionally sensitive names, value-shape heuristics for
//! token-like values, and a keyword fallback for custom header names.
//!
//! The classifier is total and side-effect free. The only rejected input is
//! a missing header name; every value, including the empty string, gets a
//! verdict.

mod classifier;
pub mod error;
pub mod rules;

pub use classifier::{ClassifierConfig, HeaderCandidate, SecrecyClassifier};
pub use error::ClassifyError;
pub use rules::RuleKind;
