//! Synchronous filesystem plumbing under a sync directory.
//!
//! Everything here is best-effort and line-oriented: appends go to the end
//! of per-path log files, rewrites go through a hidden temp file plus
//! rename, and directory scans prune unchanged subtrees via per-directory
//! version counters.

pub mod log_file;
pub mod scan;
pub mod sequence;
