#![forbid(unsafe_code)]

//! Decentralized synchronization of key/value mappings over a shared
//! directory.
//!
//! Application instances on different devices share one directory through
//! any file-sync transport (a cloud folder, a peer sync tool). Each
//! instance appends timestamped entries to its own logs; every instance
//! reads the others' logs and converges on the same state under
//! last-writer-wins, with no server and no network traffic of its own.

pub mod core;
pub mod engine;
pub mod error;
mod io;
pub mod paths;
pub mod telemetry;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

// Re-export the public surface at the crate root for convenience
pub use crate::core::{CoreError, Entry, EntryWithPath, codec, json};
pub use crate::engine::{
    Decsync, FolderChangeCallback, FolderWatcher, OnEntryUpdateListener, SubdirEntryListener,
    SubfileEntryListener, get_static_info, get_stored_static_value,
};
pub use crate::paths::{app_id, decsync_subdir, default_decsync_dir, list_decsync_collections};
