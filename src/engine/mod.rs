//! The convergence engine.
//!
//! One [`Decsync`] instance owns the `new-entries/<own>`,
//! `stored-entries/<own>` and `read-bytes/<own>` trees under its sync
//! directory and reads every other appId's log. Everything is synchronous
//! and best-effort: a corrupt or unreadable artifact never blocks
//! convergence of the rest, and ingestion failures are logged rather than
//! surfaced.
//!
//! Write path: entries append to the own log, bump every ancestor version
//! counter, then merge into the own stored view. Read path: per-peer
//! cursors mark how many bytes of each log have been applied; the cursor is
//! advanced before the tail is parsed, biasing a crash toward skipping
//! rather than reapplying.

pub mod listener;
mod location;
pub mod observer;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::core::{CoreError, Entry, EntryWithPath, codec, json};
use crate::io::{log_file, scan, sequence};

use location::{EntriesLocation, NEW_ENTRIES_DIR, READ_BYTES_DIR, STORED_ENTRIES_DIR};

pub use listener::{OnEntryUpdateListener, SubdirEntryListener, SubfileEntryListener};
pub use observer::{FolderChangeCallback, FolderWatcher};

type ValuePred<'a> = Option<&'a dyn Fn(&Value) -> bool>;
type SyncCompleteHook<T> = Box<dyn Fn(&T) + Send + Sync>;

/// One instance of a sync namespace, writing as a fixed appId.
///
/// The listener set is closed at construction; `extra` is an opaque host
/// value handed through to listeners and the sync-complete hook.
pub struct Decsync<T> {
    dir: PathBuf,
    own_app_id: String,
    own_app_id_enc: String,
    listeners: Vec<Box<dyn OnEntryUpdateListener<T>>>,
    sync_complete: Mutex<Option<SyncCompleteHook<T>>>,
    op_lock: Mutex<()>,
}

impl<T> Decsync<T> {
    /// Open the sync namespace rooted at `dir`, writing as `own_app_id`.
    ///
    /// Creates the own new-entries tree so peers can observe this instance.
    pub fn new(
        dir: impl Into<PathBuf>,
        own_app_id: impl Into<String>,
        listeners: Vec<Box<dyn OnEntryUpdateListener<T>>>,
    ) -> crate::Result<Self> {
        let dir = dir.into();
        let own_app_id = own_app_id.into();
        if own_app_id.is_empty() {
            return Err(CoreError::InvalidAppId {
                reason: "empty".into(),
            }
            .into());
        }
        let own_app_id_enc = codec::encode_segment(&own_app_id);
        fs::create_dir_all(dir.join(NEW_ENTRIES_DIR).join(&own_app_id_enc))?;
        Ok(Self {
            dir,
            own_app_id,
            own_app_id_enc,
            listeners,
            sync_complete: Mutex::new(None),
            op_lock: Mutex::new(()),
        })
    }

    /// The writer identity of this instance.
    pub fn own_app_id(&self) -> &str {
        &self.own_app_id
    }

    /// Root directory of the sync namespace.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Install the hook invoked after each completed ingestion pass.
    pub fn set_sync_complete(&self, hook: impl Fn(&T) + Send + Sync + 'static) {
        *self.lock_hook() = Some(Box::new(hook));
    }

    /// Record a single assignment of `key` to `value` at `path`.
    pub fn set_entry(&self, path: &[String], key: Value, value: Value) {
        self.set_entries_for_path(path, vec![Entry::new(key, value)]);
    }

    /// Record a batch of assignments, grouped by their paths.
    pub fn set_entries(&self, entries: Vec<EntryWithPath>) {
        let mut groups: Vec<(Vec<String>, Vec<Entry>)> = Vec::new();
        for EntryWithPath { path, entry } in entries {
            match groups.iter_mut().find(|(group_path, _)| *group_path == path) {
                Some((_, group)) => group.push(entry),
                None => groups.push((path, vec![entry])),
            }
        }
        for (path, group) in groups {
            self.set_entries_for_path(&path, group);
        }
    }

    /// Record `entries` at `path`: append to the own log, bump every
    /// ancestor version counter, then merge into the own stored view.
    ///
    /// The log append comes first so that a crash leaves the durable log
    /// ahead of the materialized view, which re-converges on replay.
    pub fn set_entries_for_path(&self, path: &[String], entries: Vec<Entry>) {
        if entries.is_empty() {
            return;
        }
        let _guard = self.op_guard();
        if let Err(err) = self.append_own_entries(path, &entries) {
            tracing::warn!("failed to record entries at {:?}: {}", path, err);
            return;
        }
        let mut entries = entries;
        self.update_stored_entries(&self.own_entries_location(path), &mut entries);
    }

    fn append_own_entries(&self, path: &[String], entries: &[Entry]) -> io::Result<()> {
        let own_new_dir = self.dir.join(NEW_ENTRIES_DIR).join(&self.own_app_id_enc);
        let file = own_new_dir.join(location::encoded_relative(path));
        log_file::append_lines(&file, entries.iter().map(Entry::to_line))?;

        // version every ancestor directory, root included
        let mut dir = own_new_dir;
        sequence::bump(&dir)?;
        for segment in &path[..path.len().saturating_sub(1)] {
            dir.push(codec::encode_segment(segment));
            sequence::bump(&dir)?;
        }
        Ok(())
    }

    /// Ingest every unread byte of every peer's log, then fire the
    /// sync-complete hook.
    ///
    /// Subtrees whose version counters match the mirrored values from the
    /// previous pass are pruned without being read.
    pub fn execute_all_new_entries(&self, extra: &T) {
        let _guard = self.op_guard();
        let new_dir = self.dir.join(NEW_ENTRIES_DIR);
        let read_bytes_dir = self.dir.join(READ_BYTES_DIR).join(&self.own_app_id_enc);

        let own = self.own_app_id.as_str();
        let mut not_own = |path: &[String]| path.first().is_none_or(|app_id| app_id.as_str() != own);
        let paths = scan::list_files_recursive_relative(&new_dir, Some(&read_bytes_dir), &mut not_own);

        for mut segments in paths {
            if segments.is_empty() {
                continue;
            }
            let app_id = segments.remove(0);
            let loc = self.new_entries_location(&segments, &app_id);
            self.execute_entries_location(&loc, extra, None, None);
        }
        self.call_sync_complete(extra);
    }

    /// Replay the own materialized view below `path_prefix` into listeners.
    ///
    /// Used to hand already-synced state to listeners registered after the
    /// fact, typically at host startup.
    pub fn execute_stored_entries(&self, path_prefix: &[String], extra: &T) {
        let _guard = self.op_guard();
        self.execute_stored_entries_inner(path_prefix, extra, None, None, &mut |_| true);
    }

    /// Replay the materialized entries at exactly `path`, optionally
    /// restricted to `keys`.
    pub fn execute_stored_entries_for_path(
        &self,
        path: &[String],
        keys: Option<&[Value]>,
        extra: &T,
    ) {
        let _guard = self.op_guard();
        let key_filter;
        let key_pred: ValuePred<'_> = match keys {
            Some(keys) => {
                key_filter = move |key: &Value| keys.iter().any(|k| json::equals(k, key));
                Some(&key_filter)
            }
            None => None,
        };
        self.execute_stored_entries_inner(path, extra, key_pred, None, &mut |_| true);
    }

    /// Replay the materialized entry for one `(path, key)` pair.
    pub fn execute_stored_entry(&self, path: &[String], key: &Value, extra: &T) {
        self.execute_stored_entries_for_path(path, Some(std::slice::from_ref(key)), extra);
    }

    fn execute_stored_entries_inner(
        &self,
        path_prefix: &[String],
        extra: &T,
        key_pred: ValuePred<'_>,
        value_pred: ValuePred<'_>,
        path_pred: &mut dyn FnMut(&[String]) -> bool,
    ) {
        let src = self
            .dir
            .join(STORED_ENTRIES_DIR)
            .join(&self.own_app_id_enc)
            .join(location::encoded_relative(path_prefix));
        for leaf in scan::list_files_recursive_relative(&src, None, path_pred) {
            let mut path = path_prefix.to_vec();
            path.extend(leaf);
            let loc = self.stored_entries_location(path);
            self.execute_entries_location(&loc, extra, key_pred, value_pred);
        }
    }

    /// Bootstrap the own stored view from the freshest peer.
    ///
    /// Intended for install or reinstall: inherits the peer's materialized
    /// view and cursors, then declares the peer's own log consumed so it is
    /// not reapplied on top. A subsequent [`Self::execute_stored_entries`]
    /// replays the inherited state into listeners.
    pub fn init_stored_entries(&self) {
        let _guard = self.op_guard();
        let Some(app_id) = self.latest_app_id_inner() else {
            return;
        };
        if app_id == self.own_app_id {
            return;
        }
        let app_id_enc = codec::encode_segment(&app_id);

        let stored_dir = self.dir.join(STORED_ENTRIES_DIR);
        if let Err(err) = copy_dir_recursive(
            &stored_dir.join(&app_id_enc),
            &stored_dir.join(&self.own_app_id_enc),
        ) {
            tracing::warn!("failed to inherit stored entries of {:?}: {}", app_id, err);
            return;
        }

        let read_bytes_dir = self.dir.join(READ_BYTES_DIR);
        if let Err(err) = copy_dir_recursive(
            &read_bytes_dir.join(&app_id_enc),
            &read_bytes_dir.join(&self.own_app_id_enc),
        ) {
            tracing::warn!("failed to inherit cursors of {:?}: {}", app_id, err);
        }

        // the inherited view already reflects the peer's own log
        let peer_new_dir = self.dir.join(NEW_ENTRIES_DIR).join(&app_id_enc);
        let peer_cursor_dir = read_bytes_dir.join(&self.own_app_id_enc).join(&app_id_enc);
        let leaves =
            scan::list_files_recursive_relative(&peer_new_dir, Some(&peer_cursor_dir), &mut |_| {
                true
            });
        for leaf in leaves {
            let rel = location::encoded_relative(&leaf);
            let file = peer_new_dir.join(&rel);
            let cursor = peer_cursor_dir.join(&rel);
            if let Err(err) = write_cursor(&cursor, log_file::file_len(&file)) {
                tracing::warn!("failed to record cursor for {:?}: {}", file, err);
            }
        }
    }

    /// The appId whose most recent stored entry is newest, preferring the
    /// own appId on a datetime tie.
    pub fn latest_app_id(&self) -> Option<String> {
        let _guard = self.op_guard();
        self.latest_app_id_inner()
    }

    fn latest_app_id_inner(&self) -> Option<String> {
        let stored_dir = self.dir.join(STORED_ENTRIES_DIR);
        let entries = match fs::read_dir(&stored_dir) {
            Ok(entries) => entries,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::warn!("failed to list {:?}: {}", stored_dir, err);
                }
                return None;
            }
        };

        let mut best: Option<(String, String)> = None; // (datetime, appId)
        for dirent in entries.flatten() {
            let name = dirent.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            let app_id = match codec::decode_segment(name) {
                Ok(app_id) => app_id,
                Err(err) => {
                    tracing::warn!("skipping undecodable appId dir {:?}: {}", name, err);
                    continue;
                }
            };
            let Some(datetime) = max_datetime_under(&dirent.path()) else {
                continue;
            };
            let wins = match &best {
                None => true,
                Some((best_datetime, _)) => {
                    datetime > *best_datetime
                        || (datetime == *best_datetime && app_id == self.own_app_id)
                }
            };
            if wins {
                best = Some((datetime, app_id));
            }
        }
        best.map(|(_, app_id)| app_id)
    }

    /// Hook this instance to an external recursive watcher on the
    /// new-entries tree.
    ///
    /// Watcher init failure is returned; the instance stays usable via
    /// explicit [`Self::execute_all_new_entries`].
    pub fn init_observer<W: FolderWatcher>(
        self: Arc<Self>,
        watcher: &mut W,
        extra: T,
    ) -> crate::Result<()>
    where
        T: Clone + Send + Sync + 'static,
    {
        let root = self.dir.join(NEW_ENTRIES_DIR);
        fs::create_dir_all(&root)?;
        watcher.watch(
            &root,
            Box::new(move |_root, rel| self.dispatch_folder_event(rel, &extra)),
        )?;
        Ok(())
    }

    fn dispatch_folder_event(&self, rel: &Path, extra: &T) {
        let Some((app_id, path)) = observer::decode_event_path(rel) else {
            return;
        };
        if app_id == self.own_app_id {
            return;
        }
        let loc = self.new_entries_location(&path, &app_id);
        if !loc.new_entries_file.is_file() {
            return;
        }
        let _guard = self.op_guard();
        self.execute_entries_location(&loc, extra, None, None);
        self.call_sync_complete(extra);
    }

    /// Ingest the unread tail of one log location.
    fn execute_entries_location(
        &self,
        loc: &EntriesLocation,
        extra: &T,
        key_pred: ValuePred<'_>,
        value_pred: ValuePred<'_>,
    ) {
        if let Err(err) = self.try_execute_entries_location(loc, extra, key_pred, value_pred) {
            tracing::warn!("ingestion failed for {:?}: {}", loc.new_entries_file, err);
        }
    }

    fn try_execute_entries_location(
        &self,
        loc: &EntriesLocation,
        extra: &T,
        key_pred: ValuePred<'_>,
        value_pred: ValuePred<'_>,
    ) -> io::Result<()> {
        let read_bytes = loc.read_bytes_file.as_deref().map_or(0, read_cursor);
        let size = log_file::file_len(&loc.new_entries_file);
        if read_bytes >= size {
            return Ok(());
        }
        if let Some(cursor) = &loc.read_bytes_file {
            // advanced before parsing: a crash here skips, never reapplies
            write_cursor(cursor, size)?;
        }

        let mut entries: Vec<Entry> = Vec::new();
        for line in log_file::read_lines_from(&loc.new_entries_file, read_bytes)? {
            let entry = match Entry::from_line(&line) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(
                        "skipping malformed line in {:?}: {}",
                        loc.new_entries_file,
                        err
                    );
                    continue;
                }
            };
            if key_pred.is_some_and(|pred| !pred(&entry.key)) {
                continue;
            }
            if value_pred.is_some_and(|pred| !pred(&entry.value)) {
                continue;
            }
            merge_latest(&mut entries, entry);
        }

        self.update_stored_entries(loc, &mut entries);
        if entries.is_empty() {
            return Ok(());
        }

        match self
            .listeners
            .iter()
            .find(|listener| listener.matches_path(&loc.path))
        {
            Some(listener) => listener.on_entries_update(&loc.path, &entries, extra),
            None => tracing::error!("no listener matches path {:?}", loc.path),
        }
        Ok(())
    }

    /// Merge `entries` into the stored view of `loc`, dropping from
    /// `entries` whatever the stored view already supersedes.
    fn update_stored_entries(&self, loc: &EntriesLocation, entries: &mut Vec<Entry>) {
        if let Err(err) = self.try_update_stored_entries(loc, entries) {
            tracing::warn!("stored view update failed for {:?}: {}", loc.path, err);
        }
    }

    fn try_update_stored_entries(
        &self,
        loc: &EntriesLocation,
        entries: &mut Vec<Entry>,
    ) -> io::Result<()> {
        let Some(stored_file) = &loc.stored_entries_file else {
            return Ok(());
        };

        let mut have_to_filter = false;
        if stored_file.is_file() {
            for line in log_file::read_lines_from(stored_file, 0)? {
                let stored = match Entry::from_line(&line) {
                    Ok(stored) => stored,
                    Err(err) => {
                        tracing::warn!("skipping malformed line in {:?}: {}", stored_file, err);
                        continue;
                    }
                };
                entries.retain(|incoming| {
                    if !json::equals(&incoming.key, &stored.key) {
                        return true;
                    }
                    if incoming.datetime > stored.datetime {
                        have_to_filter = true;
                        true
                    } else {
                        // stored is at least as fresh; equal datetimes keep stored
                        false
                    }
                });
            }
        }

        if have_to_filter {
            log_file::filter_file(stored_file, |line| match Entry::from_line(line) {
                Ok(stored) => !entries
                    .iter()
                    .any(|incoming| json::equals(&incoming.key, &stored.key)),
                Err(_) => true,
            })?;
        }
        if !entries.is_empty() {
            log_file::append_lines(stored_file, entries.iter().map(Entry::to_line))?;
        }
        Ok(())
    }

    fn new_entries_location(&self, path: &[String], app_id: &str) -> EntriesLocation {
        let app_id_enc = codec::encode_segment(app_id);
        let rel = location::encoded_relative(path);
        EntriesLocation {
            path: path.to_vec(),
            new_entries_file: self.dir.join(NEW_ENTRIES_DIR).join(&app_id_enc).join(&rel),
            stored_entries_file: Some(
                self.dir
                    .join(STORED_ENTRIES_DIR)
                    .join(&self.own_app_id_enc)
                    .join(&rel),
            ),
            read_bytes_file: Some(
                self.dir
                    .join(READ_BYTES_DIR)
                    .join(&self.own_app_id_enc)
                    .join(&app_id_enc)
                    .join(&rel),
            ),
        }
    }

    /// Location for merging own writes into the own stored view; no cursor.
    fn own_entries_location(&self, path: &[String]) -> EntriesLocation {
        let rel = location::encoded_relative(path);
        EntriesLocation {
            path: path.to_vec(),
            new_entries_file: self
                .dir
                .join(NEW_ENTRIES_DIR)
                .join(&self.own_app_id_enc)
                .join(&rel),
            stored_entries_file: Some(
                self.dir
                    .join(STORED_ENTRIES_DIR)
                    .join(&self.own_app_id_enc)
                    .join(&rel),
            ),
            read_bytes_file: None,
        }
    }

    /// Replay location over the materialized view: no merge, no cursor.
    fn stored_entries_location(&self, path: Vec<String>) -> EntriesLocation {
        let rel = location::encoded_relative(&path);
        EntriesLocation {
            path,
            new_entries_file: self
                .dir
                .join(STORED_ENTRIES_DIR)
                .join(&self.own_app_id_enc)
                .join(&rel),
            stored_entries_file: None,
            read_bytes_file: None,
        }
    }

    fn call_sync_complete(&self, extra: &T) {
        if let Some(hook) = self.lock_hook().as_ref() {
            hook(extra);
        }
    }

    fn lock_hook(&self) -> MutexGuard<'_, Option<SyncCompleteHook<T>>> {
        self.sync_complete
            .lock()
            .unwrap_or_else(|err| err.into_inner())
    }

    fn op_guard(&self) -> MutexGuard<'_, ()> {
        self.op_lock.lock().unwrap_or_else(|err| err.into_inner())
    }
}

/// Keep only the latest entry per structurally-distinct key.
fn merge_latest(entries: &mut Vec<Entry>, entry: Entry) {
    match entries
        .iter_mut()
        .find(|existing| json::equals(&existing.key, &entry.key))
    {
        Some(existing) => {
            if entry.datetime > existing.datetime {
                *existing = entry;
            }
        }
        None => entries.push(entry),
    }
}

fn read_cursor(path: &Path) -> u64 {
    match fs::read_to_string(path) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("unparsable cursor file {:?}: {:?}", path, raw);
                0
            }
        },
        Err(err) if err.kind() == io::ErrorKind::NotFound => 0,
        Err(err) => {
            tracing::warn!("failed to read cursor file {:?}: {}", path, err);
            0
        }
    }
}

fn write_cursor(path: &Path, size: u64) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, size.to_string())
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    if !src.exists() {
        return Ok(());
    }
    fs::create_dir_all(dst)?;
    for dirent in fs::read_dir(src)?.flatten() {
        let target = dst.join(dirent.file_name());
        if dirent.file_type()?.is_dir() {
            copy_dir_recursive(&dirent.path(), &target)?;
        } else {
            fs::copy(dirent.path(), &target)?;
        }
    }
    Ok(())
}

/// Datetime of the most recent entry in the subtree at `path`.
fn max_datetime_under(path: &Path) -> Option<String> {
    if path.is_file() {
        let lines = log_file::read_lines_from(path, 0).ok()?;
        return lines
            .iter()
            .filter_map(|line| Entry::from_line(line).ok())
            .map(|entry| entry.datetime)
            .max();
    }
    if !path.is_dir() {
        return None;
    }
    let mut max = None;
    for dirent in fs::read_dir(path).ok()?.flatten() {
        let name = dirent.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with('.') {
            continue;
        }
        let child_max = max_datetime_under(&dirent.path());
        if child_max > max {
            max = child_max;
        }
    }
    max
}

fn for_each_static_entry(decsync_dir: &Path, path: &[String], mut visit: impl FnMut(Entry)) {
    let stored_dir = decsync_dir.join(STORED_ENTRIES_DIR);
    let entries = match fs::read_dir(&stored_dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!("failed to list {:?}: {}", stored_dir, err);
            }
            return;
        }
    };
    let rel = location::encoded_relative(path);
    for dirent in entries.flatten() {
        let name = dirent.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with('.') {
            continue;
        }
        let file = dirent.path().join(&rel);
        if !file.is_file() {
            continue;
        }
        let lines = match log_file::read_lines_from(&file, 0) {
            Ok(lines) => lines,
            Err(err) => {
                tracing::warn!("failed to read {:?}: {}", file, err);
                continue;
            }
        };
        for line in lines {
            match Entry::from_line(&line) {
                Ok(entry) => visit(entry),
                Err(err) => {
                    tracing::warn!("skipping malformed line in {:?}: {}", file, err);
                }
            }
        }
    }
}

/// The effective value for `(path, key)` across every appId's stored view.
///
/// Point query over materialized state; no cursor is touched. Used for
/// simple flags such as a collection's deletion marker.
pub fn get_stored_static_value(decsync_dir: &Path, path: &[String], key: &Value) -> Option<Value> {
    let mut best: Option<Entry> = None;
    for_each_static_entry(decsync_dir, path, |entry| {
        if json::equals(&entry.key, key)
            && best
                .as_ref()
                .is_none_or(|current| entry.datetime > current.datetime)
        {
            best = Some(entry);
        }
    });
    best.map(|entry| entry.value)
}

/// All effective `(key, value)` pairs for `path` across every appId's
/// stored view.
pub fn get_static_info(decsync_dir: &Path, path: &[String]) -> Vec<(Value, Value)> {
    let mut latest: Vec<Entry> = Vec::new();
    for_each_static_entry(decsync_dir, path, |entry| {
        match latest
            .iter_mut()
            .find(|existing| json::equals(&existing.key, &entry.key))
        {
            Some(existing) => {
                if entry.datetime > existing.datetime {
                    *existing = entry;
                }
            }
            None => latest.push(entry),
        }
    });
    latest
        .into_iter()
        .map(|entry| (entry.key, entry.value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn engine(dir: &Path, app_id: &str) -> Decsync<()> {
        Decsync::new(dir, app_id, Vec::new()).unwrap()
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn set_entries_writes_log_stored_and_sequences() {
        let tmp = TempDir::new().unwrap();
        let decsync = engine(tmp.path(), "app-a");

        decsync.set_entries_for_path(
            &path(&["calendars", "work"]),
            vec![Entry::with_datetime(
                "2024-01-01T10:00:00".into(),
                json!("color"),
                json!("red"),
            )],
        );

        let log = tmp.path().join("new-entries/app-a/calendars/work");
        let stored = tmp.path().join("stored-entries/app-a/calendars/work");
        let expected = "[\"2024-01-01T10:00:00\",\"color\",\"red\"]\n";
        assert_eq!(fs::read_to_string(&log).unwrap(), expected);
        assert_eq!(fs::read_to_string(&stored).unwrap(), expected);

        assert_eq!(sequence::read(&tmp.path().join("new-entries/app-a")), 1);
        assert_eq!(
            sequence::read(&tmp.path().join("new-entries/app-a/calendars")),
            1
        );
    }

    #[test]
    fn own_merge_keeps_latest_per_key() {
        let tmp = TempDir::new().unwrap();
        let decsync = engine(tmp.path(), "app-a");
        let info = path(&["info"]);

        decsync.set_entries_for_path(
            &info,
            vec![Entry::with_datetime(
                "2024-01-01T10:00:00".into(),
                json!("color"),
                json!("red"),
            )],
        );
        decsync.set_entries_for_path(
            &info,
            vec![Entry::with_datetime(
                "2024-01-01T11:00:00".into(),
                json!("color"),
                json!("green"),
            )],
        );

        // the log keeps both lines, the stored view only the latest
        let log = fs::read_to_string(tmp.path().join("new-entries/app-a/info")).unwrap();
        assert_eq!(log.lines().count(), 2);
        let stored = fs::read_to_string(tmp.path().join("stored-entries/app-a/info")).unwrap();
        assert_eq!(stored, "[\"2024-01-01T11:00:00\",\"color\",\"green\"]\n");
    }

    #[test]
    fn own_merge_ignores_older_write() {
        let tmp = TempDir::new().unwrap();
        let decsync = engine(tmp.path(), "app-a");
        let info = path(&["info"]);

        decsync.set_entries_for_path(
            &info,
            vec![Entry::with_datetime(
                "2024-01-01T11:00:00".into(),
                json!("color"),
                json!("green"),
            )],
        );
        decsync.set_entries_for_path(
            &info,
            vec![Entry::with_datetime(
                "2024-01-01T10:00:00".into(),
                json!("color"),
                json!("red"),
            )],
        );

        let stored = fs::read_to_string(tmp.path().join("stored-entries/app-a/info")).unwrap();
        assert_eq!(stored, "[\"2024-01-01T11:00:00\",\"color\",\"green\"]\n");
    }

    #[test]
    fn merge_latest_groups_by_structural_key() {
        let mut entries = Vec::new();
        merge_latest(
            &mut entries,
            Entry::with_datetime("2024-01-01T10:00:00".into(), json!({"a": 1}), json!(1)),
        );
        merge_latest(
            &mut entries,
            Entry::with_datetime("2024-01-01T12:00:00".into(), json!({"a": 1}), json!(3)),
        );
        merge_latest(
            &mut entries,
            Entry::with_datetime("2024-01-01T11:00:00".into(), json!({"a": 1}), json!(2)),
        );
        merge_latest(
            &mut entries,
            Entry::with_datetime("2024-01-01T09:00:00".into(), json!({"a": 2}), json!(9)),
        );

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value, json!(3));
        assert_eq!(entries[1].value, json!(9));
    }

    #[test]
    fn latest_app_id_prefers_own_on_tie() {
        let tmp = TempDir::new().unwrap();
        let peer = engine(tmp.path(), "app-b");
        peer.set_entries_for_path(
            &path(&["info"]),
            vec![Entry::with_datetime(
                "2024-01-01T10:00:00".into(),
                json!("name"),
                json!("Peer"),
            )],
        );

        let own = engine(tmp.path(), "app-a");
        own.set_entries_for_path(
            &path(&["info"]),
            vec![Entry::with_datetime(
                "2024-01-01T10:00:00".into(),
                json!("name"),
                json!("Own"),
            )],
        );

        assert_eq!(own.latest_app_id().as_deref(), Some("app-a"));
        assert_eq!(peer.latest_app_id().as_deref(), Some("app-b"));
    }

    #[test]
    fn latest_app_id_without_entries_is_none() {
        let tmp = TempDir::new().unwrap();
        let decsync = engine(tmp.path(), "app-a");
        assert_eq!(decsync.latest_app_id(), None);
    }

    #[test]
    fn empty_app_id_is_rejected() {
        let tmp = TempDir::new().unwrap();
        assert!(Decsync::<()>::new(tmp.path(), "", Vec::new()).is_err());
    }

    #[test]
    fn cursor_files_roundtrip_and_default_to_zero() {
        let tmp = TempDir::new().unwrap();
        let cursor = tmp.path().join("cursors").join("file");
        assert_eq!(read_cursor(&cursor), 0);
        write_cursor(&cursor, 417).unwrap();
        assert_eq!(read_cursor(&cursor), 417);
        fs::write(&cursor, "garbage").unwrap();
        assert_eq!(read_cursor(&cursor), 0);
    }

    #[test]
    fn static_value_takes_latest_across_app_ids() {
        let tmp = TempDir::new().unwrap();
        let a = engine(tmp.path(), "app-a");
        let b = engine(tmp.path(), "app-b");
        let info = path(&["info"]);

        a.set_entries_for_path(
            &info,
            vec![Entry::with_datetime(
                "2024-01-01T10:00:00".into(),
                json!("name"),
                json!("Old"),
            )],
        );
        b.set_entries_for_path(
            &info,
            vec![Entry::with_datetime(
                "2024-01-01T11:00:00".into(),
                json!("name"),
                json!("New"),
            )],
        );

        assert_eq!(
            get_stored_static_value(tmp.path(), &info, &json!("name")),
            Some(json!("New"))
        );
        assert_eq!(
            get_stored_static_value(tmp.path(), &info, &json!("missing")),
            None
        );

        let mut infos = get_static_info(tmp.path(), &info);
        infos.sort_by(|a, b| a.0.to_string().cmp(&b.0.to_string()));
        assert_eq!(infos, vec![(json!("name"), json!("New"))]);
    }
}
