//! File locations for one logical path.

use std::path::PathBuf;

use crate::core::codec;

pub(crate) const NEW_ENTRIES_DIR: &str = "new-entries";
pub(crate) const STORED_ENTRIES_DIR: &str = "stored-entries";
pub(crate) const READ_BYTES_DIR: &str = "read-bytes";

/// Encode a logical path into its relative on-disk form.
pub(crate) fn encoded_relative(path: &[String]) -> PathBuf {
    let mut rel = PathBuf::new();
    for segment in path {
        rel.push(codec::encode_segment(segment));
    }
    rel
}

/// Resolved files for ingesting one `(appId, path)` log.
///
/// Replay locations over the materialized view read the stored file as the
/// log and carry neither a stored file nor a cursor, which turns the merge
/// and the cursor update into no-ops.
pub(crate) struct EntriesLocation {
    pub path: Vec<String>,
    pub new_entries_file: PathBuf,
    pub stored_entries_file: Option<PathBuf>,
    pub read_bytes_file: Option<PathBuf>,
}
