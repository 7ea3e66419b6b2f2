//! Core capability errors (path codec, entry lines, identity).
//!
//! These are bounded and stable: they represent refusal states for on-disk
//! artifacts, not library implementation details. Ingestion paths treat
//! them as skip-with-warning, never as fatal.

use thiserror::Error;

/// Canonical error enum for the core capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoreError {
    #[error("path segment `{raw}` is invalid: {reason}")]
    InvalidSegment { raw: String, reason: String },

    #[error("entry line is malformed: {reason}")]
    MalformedLine { reason: String },

    #[error("app id is invalid: {reason}")]
    InvalidAppId { reason: String },
}
