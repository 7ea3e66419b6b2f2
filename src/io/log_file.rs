//! Append-only log files and their rewrite path.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Append pre-rendered lines to `path`, creating parent directories.
///
/// Each line is terminated with `\n`. The file is never truncated here;
/// rewrites go through [`filter_file`].
pub fn append_lines(
    path: &Path,
    lines: impl IntoIterator<Item = String>,
) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for line in lines {
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
    }
    Ok(())
}

/// Current length of `path` in bytes, 0 when absent.
pub fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|meta| meta.len()).unwrap_or(0)
}

/// Read the lines of `path` starting at byte `offset`.
///
/// The tail is decoded as UTF-8 (lossily, so a torn multi-byte sequence at
/// the cut point cannot poison the rest) and empty lines are dropped.
pub fn read_lines_from(path: &Path, offset: u64) -> io::Result<Vec<String>> {
    let bytes = fs::read(path)?;
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(bytes.len());
    let tail = String::from_utf8_lossy(&bytes[start..]);
    Ok(tail
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

/// Rewrite `path`, keeping only lines accepted by `keep`.
///
/// Survivors go to `.<name>.tmp` beside the original, which is then renamed
/// over it; the temp name is hidden so concurrent scans skip it. No-op when
/// the file does not exist.
pub fn filter_file(path: &Path, mut keep: impl FnMut(&str) -> bool) -> io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let name = path.file_name().and_then(|name| name.to_str()).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "file name is not valid UTF-8")
    })?;
    let tmp_path = path.with_file_name(format!(".{name}.tmp"));

    let lines = read_lines_from(path, 0)?;
    let mut tmp = File::create(&tmp_path)?;
    for line in &lines {
        if keep(line) {
            tmp.write_all(line.as_bytes())?;
            tmp.write_all(b"\n")?;
        }
    }
    tmp.sync_all()?;
    drop(tmp);
    fs::rename(&tmp_path, path)?;
    Ok(())
}
