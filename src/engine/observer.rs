//! Change dispatch from an external recursive watcher.
//!
//! The watcher itself is a collaborator supplied by the host (inotify,
//! FSEvents, polling, whatever fits the platform). The contract is small:
//! deliver at least one `(root, relative_path)` event per file
//! modification, eventually, on a thread of the watcher's choosing.
//! Duplicate events are tolerated because the read cursor short-circuits.

use std::io;
use std::path::{Component, Path};

use crate::core::codec;

/// Callback invoked by a watcher for each changed path under its root.
pub type FolderChangeCallback = Box<dyn Fn(&Path, &Path) + Send + Sync>;

/// External recursive directory watcher.
pub trait FolderWatcher {
    /// Start watching `root` recursively, delivering events to `on_change`.
    fn watch(&mut self, root: &Path, on_change: FolderChangeCallback) -> io::Result<()>;

    /// Stop delivering events.
    fn stop(&mut self);
}

/// Decode a watcher event path into `(appId, path)`.
///
/// Empty paths, hidden leaf names, and undecodable segments yield `None`;
/// the event is ignored.
pub(crate) fn decode_event_path(rel: &Path) -> Option<(String, Vec<String>)> {
    let mut raw = Vec::new();
    for component in rel.components() {
        let Component::Normal(name) = component else {
            continue;
        };
        let Some(name) = name.to_str() else {
            tracing::warn!("ignoring event with non-UTF-8 path {:?}", rel);
            return None;
        };
        if name.is_empty() {
            continue;
        }
        raw.push(name);
    }
    if raw.last()?.starts_with('.') {
        return None;
    }

    let mut decoded = Vec::with_capacity(raw.len());
    for name in raw {
        match codec::decode_segment(name) {
            Ok(segment) => decoded.push(segment),
            Err(err) => {
                tracing::warn!("ignoring event with undecodable segment: {}", err);
                return None;
            }
        }
    }
    let app_id = decoded.remove(0);
    Some((app_id, decoded))
}
