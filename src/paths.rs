//! Sync directory resolution and naming helpers.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::core::codec;
use crate::engine::get_stored_static_value;

/// Root directory for sync namespaces.
///
/// Uses `DECSYNC_DIR` if set, otherwise `$XDG_DATA_HOME/decsync` or
/// `~/.local/share/decsync`.
pub fn default_decsync_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("DECSYNC_DIR")
        && !dir.trim().is_empty()
    {
        return PathBuf::from(dir);
    }

    std::env::var("XDG_DATA_HOME")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".local")
                .join("share")
        })
        .join("decsync")
}

/// Directory of one sync namespace: a sync type and optionally one
/// collection below it.
pub fn decsync_subdir(base: Option<&Path>, sync_type: &str, collection: Option<&str>) -> PathBuf {
    let mut dir = base.map_or_else(default_decsync_dir, Path::to_path_buf);
    dir.push(codec::encode_segment(sync_type));
    if let Some(collection) = collection {
        dir.push(codec::encode_segment(collection));
    }
    dir
}

/// Decoded names of the collections of `sync_type` under `base`.
///
/// With `ignore_deleted`, a collection whose `["info"]` `"deleted"` static
/// value is the JSON boolean `true` is omitted.
pub fn list_decsync_collections(
    base: Option<&Path>,
    sync_type: &str,
    ignore_deleted: bool,
) -> Vec<String> {
    let dir = decsync_subdir(base, sync_type, None);
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!("failed to list collections under {:?}: {}", dir, err);
            }
            return Vec::new();
        }
    };

    let mut collections = Vec::new();
    for dirent in entries.flatten() {
        if !dirent.file_type().is_ok_and(|ty| ty.is_dir()) {
            continue;
        }
        let name = dirent.file_name();
        let Some(name) = name.to_str() else { continue };
        if name.starts_with('.') {
            continue;
        }
        let collection = match codec::decode_segment(name) {
            Ok(collection) => collection,
            Err(err) => {
                tracing::warn!("skipping undecodable collection name {:?}: {}", name, err);
                continue;
            }
        };
        if ignore_deleted {
            let info = ["info".to_string()];
            let deleted =
                get_stored_static_value(&dirent.path(), &info, &Value::String("deleted".into()));
            if deleted == Some(Value::Bool(true)) {
                continue;
            }
        }
        collections.push(collection);
    }
    collections.sort();
    collections
}

/// Writer identity for one running instance: `<device-model>-<appName>`,
/// optionally suffixed with a zero-padded instance id for hosts running
/// several instances of the same application.
pub fn app_id(device_model: &str, app_name: &str, id: Option<u32>) -> String {
    match id {
        Some(id) => {
            assert!(id < 100_000, "instance id must be below 100000");
            format!("{device_model}-{app_name}-{id:05}")
        }
        None => format!("{device_model}-{app_name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Entry;
    use crate::engine::Decsync;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn subdir_encodes_sync_type_and_collection() {
        let base = PathBuf::from("/sync");
        assert_eq!(
            decsync_subdir(Some(base.as_path()), "contacts", None),
            PathBuf::from("/sync/contacts")
        );
        assert_eq!(
            decsync_subdir(Some(base.as_path()), "rss", Some("my feeds")),
            PathBuf::from("/sync/rss/my%20feeds")
        );
    }

    #[test]
    fn app_id_formats_with_and_without_instance_id() {
        assert_eq!(app_id("laptop", "news", None), "laptop-news");
        assert_eq!(app_id("laptop", "news", Some(7)), "laptop-news-00007");
        assert_eq!(app_id("laptop", "news", Some(99_999)), "laptop-news-99999");
    }

    #[test]
    fn collections_are_listed_decoded_and_deletion_filtered() {
        let base = TempDir::new().unwrap();
        let dir = |collection: &str| decsync_subdir(Some(base.path()), "calendars", Some(collection));

        let work: Decsync<()> = Decsync::new(dir("work"), "app-a", Vec::new()).unwrap();
        work.set_entries_for_path(
            &["info".to_string()],
            vec![Entry::with_datetime(
                "2024-01-01T10:00:00".into(),
                json!("name"),
                json!("Work"),
            )],
        );

        let old: Decsync<()> = Decsync::new(dir("old stuff"), "app-a", Vec::new()).unwrap();
        old.set_entries_for_path(
            &["info".to_string()],
            vec![Entry::with_datetime(
                "2024-01-01T10:00:00".into(),
                json!("deleted"),
                json!(true),
            )],
        );

        let all = list_decsync_collections(Some(base.path()), "calendars", false);
        assert_eq!(all, vec!["old stuff".to_string(), "work".to_string()]);

        let live = list_decsync_collections(Some(base.path()), "calendars", true);
        assert_eq!(live, vec!["work".to_string()]);

        assert!(list_decsync_collections(Some(base.path()), "contacts", true).is_empty());
    }
}
