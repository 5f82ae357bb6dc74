//! Metadata Reader: extracts `// Key: value` fields from leading comments

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{MetadataError, Record, Result};
use crate::config::DashConfig;
use crate::schema::FieldSchema;

/// Collects field values line by line and reports when every field is filled
struct FieldCollector<'a> {
    schema: &'a FieldSchema,
    values: BTreeMap<String, String>,
}

impl<'a> FieldCollector<'a> {
    fn new(schema: &'a FieldSchema) -> Self {
        Self { schema, values: BTreeMap::new() }
    }

    /// Feed one raw line; returns true once every schema field has a value
    fn feed(&mut self, line: &str) -> bool {
        if let Some((name, value)) = regex_utils::comment::split_field(line.trim()) {
            if let Some(field) = self.schema.get(name) {
                self.values.insert(field.name.clone(), value.to_string());
            }
        }
        self.is_complete()
    }

    fn is_complete(&self) -> bool {
        self.schema
            .names()
            .all(|name| self.values.get(name).map(|v| !v.is_empty()).unwrap_or(false))
    }

    /// Fill in defaults for anything not seen
    fn finish(mut self) -> BTreeMap<String, String> {
        for field in self.schema.fields() {
            let slot = self.values.entry(field.name.clone()).or_default();
            if slot.is_empty() {
                *slot = field.default_value().to_string();
            }
        }
        self.values
    }
}

/// Reads metadata records from source files
pub struct MetadataReader {
    config: DashConfig,
}

impl MetadataReader {
    pub fn new(config: DashConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DashConfig {
        &self.config
    }

    /// Extract the record for `path`. Never fails: an unreadable file yields a
    /// record of defaults and a warning.
    pub fn extract(&self, path: &Path) -> Record {
        match self.try_extract(path) {
            Ok(record) => record,
            Err(e) => {
                warn!("{}", e);
                Record::empty(path, &self.config.schema)
            }
        }
    }

    /// Extract the record for `path`, surfacing read and decode errors
    pub fn try_extract(&self, path: &Path) -> Result<Record> {
        let file = File::open(path).map_err(|e| MetadataError::unreadable(path, e))?;
        let reader = BufReader::new(file);

        let mut collector = FieldCollector::new(&self.config.schema);
        for line in reader.lines().take(self.config.field_window) {
            let line = line.map_err(|e| MetadataError::unreadable(path, e))?;
            if collector.feed(&line) {
                break;
            }
        }

        let modified_at = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map(chrono::DateTime::<chrono::Local>::from)
            .ok();

        Ok(Record { path: path.to_path_buf(), fields: collector.finish(), modified_at })
    }

    /// Parse fields from in-memory lines, honouring the field window
    pub fn parse_lines<I, S>(&self, lines: I) -> BTreeMap<String, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut collector = FieldCollector::new(&self.config.schema);
        for line in lines.into_iter().take(self.config.field_window) {
            if collector.feed(line.as_ref()) {
                break;
            }
        }
        collector.finish()
    }

    /// Walk the configured root and extract a record for every matching file.
    /// Directory entries are visited in file-name order.
    pub fn scan(&self) -> Vec<Record> {
        let root = &self.config.root;
        if !root.exists() {
            warn!("Scan root {:?} does not exist", root);
            return Vec::new();
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {:?}: {}", root, e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.config.matches_extension(entry.path()) {
                continue;
            }

            records.push(self.extract(entry.path()));
        }

        debug!("Scanned {} records under {:?}", records.len(), root);
        records
    }
}
