//! Core value types for the convergence engine.
//!
//! Module order follows type dependency order:
//! - error: refusal states for on-disk artifacts
//! - codec: percent path codec
//! - json: structural value equality
//! - entry: timestamped assignments and their line format

pub mod codec;
pub mod entry;
pub mod error;
pub mod json;

pub use entry::{Entry, EntryWithPath, now_datetime};
pub use error::CoreError;
