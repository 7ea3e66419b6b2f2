//! Listener capability: where decoded updates are delivered.
//!
//! A listener claims a region of the path tree via `matches_path` and
//! receives the merged entries for it. The listener set is closed at engine
//! construction; dispatch picks the first match.

use crate::core::Entry;

/// A domain listener registered with the engine.
pub trait OnEntryUpdateListener<T>: Send + Sync {
    /// Whether this listener handles `path`.
    fn matches_path(&self, path: &[String]) -> bool;

    /// Deliver the effective entries for `path`.
    fn on_entries_update(&self, path: &[String], entries: &[Entry], extra: &T);
}

type SubdirCallback<T> = Box<dyn Fn(&[String], &Entry, &T) + Send + Sync>;
type SubfileCallback<T> = Box<dyn Fn(&Entry, &T) + Send + Sync>;

/// Matches every path below a fixed subdirectory; delivers entries one at a
/// time with the subdirectory prefix stripped.
pub struct SubdirEntryListener<T> {
    subdir: Vec<String>,
    on_entry: SubdirCallback<T>,
}

impl<T> SubdirEntryListener<T> {
    pub fn new(
        subdir: Vec<String>,
        on_entry: impl Fn(&[String], &Entry, &T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            subdir,
            on_entry: Box::new(on_entry),
        }
    }
}

impl<T> OnEntryUpdateListener<T> for SubdirEntryListener<T> {
    fn matches_path(&self, path: &[String]) -> bool {
        path.len() >= self.subdir.len() && path[..self.subdir.len()] == self.subdir[..]
    }

    fn on_entries_update(&self, path: &[String], entries: &[Entry], extra: &T) {
        let rest = &path[self.subdir.len()..];
        for entry in entries {
            (self.on_entry)(rest, entry, extra);
        }
    }
}

/// Matches exactly one path; delivers entries one at a time.
pub struct SubfileEntryListener<T> {
    subfile: Vec<String>,
    on_entry: SubfileCallback<T>,
}

impl<T> SubfileEntryListener<T> {
    pub fn new(
        subfile: Vec<String>,
        on_entry: impl Fn(&Entry, &T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            subfile,
            on_entry: Box::new(on_entry),
        }
    }
}

impl<T> OnEntryUpdateListener<T> for SubfileEntryListener<T> {
    fn matches_path(&self, path: &[String]) -> bool {
        path == self.subfile
    }

    fn on_entries_update(&self, _path: &[String], entries: &[Entry], extra: &T) {
        for entry in entries {
            (self.on_entry)(entry, extra);
        }
    }
}
