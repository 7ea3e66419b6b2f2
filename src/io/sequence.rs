//! Per-directory `.decsync-sequence` version counters.
//!
//! Every append under `new-entries/<own>/` bumps the counter of each
//! ancestor directory, and readers mirror the observed value next to their
//! cursors so unchanged subtrees can be pruned on the next scan.

use std::fs;
use std::io;
use std::path::Path;

pub const SEQUENCE_FILE: &str = ".decsync-sequence";

/// Raw sequence file contents of `dir`, `None` when absent or unreadable.
pub fn read_raw(dir: &Path) -> Option<String> {
    let path = dir.join(SEQUENCE_FILE);
    match fs::read_to_string(&path) {
        Ok(raw) => Some(raw),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            tracing::warn!("failed to read sequence file {:?}: {}", path, err);
            None
        }
    }
}

/// Sequence value of `dir`, treating absent or unparsable files as 0.
pub fn read(dir: &Path) -> i64 {
    let Some(raw) = read_raw(dir) else { return 0 };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!("unparsable sequence file under {:?}: {:?}", dir, raw);
            0
        }
    }
}

/// Increment the sequence value of `dir` by one.
pub fn bump(dir: &Path) -> io::Result<()> {
    let value = read(dir);
    fs::write(dir.join(SEQUENCE_FILE), (value + 1).to_string())
}

/// Best-effort copy of the sequence value of `src_dir` into `dst_dir`.
pub fn copy(src_dir: &Path, dst_dir: &Path) {
    let Some(raw) = read_raw(src_dir) else { return };
    let result = fs::create_dir_all(dst_dir)
        .and_then(|()| fs::write(dst_dir.join(SEQUENCE_FILE), raw));
    if let Err(err) = result {
        tracing::warn!(
            "failed to mirror sequence file into {:?}: {}",
            dst_dir,
            err
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn absent_and_garbage_read_as_zero() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(read(tmp.path()), 0);

        fs::write(tmp.path().join(SEQUENCE_FILE), "not a number").unwrap();
        assert_eq!(read(tmp.path()), 0);
    }

    #[test]
    fn bump_increments_from_current_value() {
        let tmp = TempDir::new().unwrap();
        bump(tmp.path()).unwrap();
        assert_eq!(read(tmp.path()), 1);
        bump(tmp.path()).unwrap();
        bump(tmp.path()).unwrap();
        assert_eq!(read(tmp.path()), 3);
    }

    #[test]
    fn copy_mirrors_raw_contents() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::write(src.path().join(SEQUENCE_FILE), "17").unwrap();

        let mirror = dst.path().join("nested");
        copy(src.path(), &mirror);
        assert_eq!(read_raw(&mirror).as_deref(), Some("17"));

        // nothing to copy when the source has no sequence file
        let empty = TempDir::new().unwrap();
        let target = dst.path().join("other");
        copy(empty.path(), &target);
        assert!(!target.exists());
    }
}
