//! Metadata extraction and in-place comment updates
//!
//! Source files carry their metadata as leading line comments:
//!
//! ```text
//! // Problem: Two Sum
//! // Level: Easy
//! // Revisit: No
//! // Notes: hash map
//! class Solution { ... }
//! ```
//!
//! The [`MetadataReader`] turns those comments into [`Record`]s, the
//! [`MetadataWriter`] applies [`UpdateRequest`]s back onto the comments and the
//! [`BatchDriver`] runs many requests while containing per-entry failures.

pub mod batch;
pub mod reader;
pub mod request;
pub mod writer;


use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::schema::FieldSchema;

pub use batch::{BatchDriver, BatchReport, SkippedEntry};
pub use reader::MetadataReader;
pub use request::UpdateRequest;
pub use writer::{Edit, LineEditor, MetadataWriter, UpdateOutcome};

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("File unreadable {path:?}: {reason}")]
    FileUnreadable { path: PathBuf, reason: String },

    #[error("File unwritable {path:?}: {reason}")]
    FileUnwritable { path: PathBuf, reason: String },

    #[error("Malformed patch at entry {index}: {reason}")]
    MalformedPatch { index: usize, reason: String },

    #[error("Request file {path:?}: {reason}")]
    RequestFile { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, MetadataError>;

impl MetadataError {
    pub(crate) fn unreadable(path: &Path, reason: impl ToString) -> Self {
        Self::FileUnreadable { path: path.to_path_buf(), reason: reason.to_string() }
    }

    pub(crate) fn unwritable(path: &Path, reason: impl ToString) -> Self {
        Self::FileUnwritable { path: path.to_path_buf(), reason: reason.to_string() }
    }
}

/// Values callers must treat as "field absent"
pub const ABSENT_MARKERS: [&str; 2] = ["", "-"];

/// Metadata extracted from one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Path of the file as it was scanned; identifies the record
    pub path: PathBuf,
    /// Field name -> value; every schema field is present
    pub fields: BTreeMap<String, String>,
    /// Modification time, for display ordering only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Local>>,
}

impl Record {
    /// A record holding the schema defaults for every field
    pub fn empty(path: impl Into<PathBuf>, schema: &FieldSchema) -> Self {
        let fields = schema
            .fields()
            .iter()
            .map(|f| (f.name.clone(), f.default_value().to_string()))
            .collect();
        Self { path: path.into(), fields, modified_at: None }
    }

    /// Field value, `""` when the field is unknown
    pub fn get(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// Whether `name` is missing, empty or holds a placeholder
    pub fn is_blank(&self, name: &str) -> bool {
        ABSENT_MARKERS.contains(&self.get(name).trim())
    }

    /// File stem, e.g. `TwoSum` for `dsa/Array/TwoSum.java`
    pub fn pattern(&self) -> String {
        self.path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
    }

    /// Value of `name`, or the file stem when the field is blank
    pub fn label(&self, name: &str) -> String {
        if self.is_blank(name) { self.pattern() } else { self.get(name).to_string() }
    }

    /// First directory segment below `root`, normalised; `default_topic` for
    /// files that sit directly in `root` or outside it.
    pub fn topic_under(&self, root: &Path, default_topic: &str) -> String {
        let relative = self.path.strip_prefix(root).unwrap_or(&self.path);
        let mut components = relative.components();
        let first = components.next();
        let is_nested = components.next().is_some();

        match first {
            Some(segment) if is_nested => {
                regex_utils::topic::normalize(&segment.as_os_str().to_string_lossy())
                    .unwrap_or_else(|| default_topic.to_string())
            }
            _ => default_topic.to_string(),
        }
    }
}
