//! Recursive enumeration of leaf files as decoded paths.

use std::fs;
use std::path::Path;

use crate::core::codec;

use super::sequence;

/// List the leaf files under `src` as decoded segment lists, relative to
/// `src`.
///
/// Hidden names (leading `.`) are skipped at every level. When
/// `read_bytes_src` mirrors `src` and both carry an equal sequence value,
/// the whole subtree is pruned; otherwise the current value is copied into
/// the mirror after listing (best-effort). `path_pred` sees each partial
/// decoded path and prunes the subtree on false. Undecodable names are
/// skipped with a warning.
///
/// When `src` is itself a file, the result is one empty path.
pub fn list_files_recursive_relative(
    src: &Path,
    read_bytes_src: Option<&Path>,
    path_pred: &mut dyn FnMut(&[String]) -> bool,
) -> Vec<Vec<String>> {
    let mut found = Vec::new();
    let mut prefix = Vec::new();
    walk(src, read_bytes_src, path_pred, &mut prefix, &mut found);
    found
}

fn walk(
    src: &Path,
    read_bytes_src: Option<&Path>,
    path_pred: &mut dyn FnMut(&[String]) -> bool,
    prefix: &mut Vec<String>,
    found: &mut Vec<Vec<String>>,
) {
    if src.is_file() {
        found.push(prefix.clone());
        return;
    }
    if !src.is_dir() {
        return;
    }

    if let Some(mirror) = read_bytes_src
        && let Some(version) = sequence::read_raw(src)
        && sequence::read_raw(mirror).as_deref() == Some(version.as_str())
    {
        return;
    }

    let entries = match fs::read_dir(src) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!("failed to list {:?}: {}", src, err);
            return;
        }
    };
    for dirent in entries.flatten() {
        let name = dirent.file_name();
        let Some(name) = name.to_str() else {
            tracing::warn!("skipping non-UTF-8 name under {:?}", src);
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let segment = match codec::decode_segment(name) {
            Ok(segment) => segment,
            Err(err) => {
                tracing::warn!("skipping undecodable name under {:?}: {}", src, err);
                continue;
            }
        };

        prefix.push(segment);
        if path_pred(prefix) {
            let child = dirent.path();
            let child_mirror = read_bytes_src.map(|mirror| mirror.join(name));
            walk(&child, child_mirror.as_deref(), path_pred, prefix, found);
        }
        prefix.pop();
    }

    if let Some(mirror) = read_bytes_src {
        sequence::copy(src, mirror);
    }
}
