//! Timestamped assignments and their line format.
//!
//! An entry is one `(datetime, key, value)` triple, serialized as a single
//! compact JSON array per log line. The datetime is an ISO-8601 UTC string
//! at second resolution; lexicographic order on these strings equals
//! chronological order, which is what the merge relies on.

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use super::error::CoreError;

const DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// The current UTC wall clock as a second-resolution ISO-8601 string.
///
/// No timezone suffix and no fractional seconds; two writes within the same
/// second from different instances stamp equal strings.
pub fn now_datetime() -> String {
    OffsetDateTime::now_utc()
        .format(&DATETIME_FORMAT)
        .expect("datetime format description is static")
}

/// A single timestamped assignment of `key` to `value`.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub datetime: String,
    pub key: Value,
    pub value: Value,
}

impl Entry {
    /// New entry stamped with the current UTC wall clock.
    pub fn new(key: Value, value: Value) -> Self {
        Self::with_datetime(now_datetime(), key, value)
    }

    /// New entry with an explicit datetime string.
    pub fn with_datetime(datetime: String, key: Value, value: Value) -> Self {
        Self {
            datetime,
            key,
            value,
        }
    }

    /// Render the one-line wire form `[datetime,key,value]`.
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).expect("entry values serialize infallibly")
    }

    /// Parse one log line.
    ///
    /// Anything that is not a 3-element JSON array with a string in
    /// position 0 is rejected; callers skip such lines with a warning.
    pub fn from_line(line: &str) -> Result<Self, CoreError> {
        serde_json::from_str(line).map_err(|err| CoreError::MalformedLine {
            reason: err.to_string(),
        })
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.datetime, &self.key, &self.value).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (datetime, key, value) = <(String, Value, Value)>::deserialize(deserializer)?;
        Ok(Self {
            datetime,
            key,
            value,
        })
    }
}

/// An entry addressed to a path, for batch writes spanning several paths.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryWithPath {
    pub path: Vec<String>,
    pub entry: Entry,
}

impl EntryWithPath {
    pub fn new(path: Vec<String>, key: Value, value: Value) -> Self {
        Self {
            path,
            entry: Entry::new(key, value),
        }
    }
}
