//! Update requests: sparse patches of field values for one file

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use super::{MetadataError, Result};
use crate::schema::FieldSchema;

/// `{ "path": "...", "level": "Easy", "notes": "" }`
///
/// Keys other than `path` name fields and are matched case-insensitively
/// against the schema. Blank values leave the field untouched.
///
/// Deserializing never fails: an entry that is not an object, or whose `path`
/// is not a string, is kept with [`UpdateRequest::invalid`] set so the batch
/// can skip it at its own index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct UpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
    /// Why the entry could not be read as a request
    #[serde(skip)]
    pub invalid: Option<String>,
}

impl From<Value> for UpdateRequest {
    fn from(value: Value) -> Self {
        let mut map = match value {
            Value::Object(map) => map,
            other => return Self::rejected(format!("expected an object, got {}", other)),
        };

        let path = match map.remove("path") {
            None | Some(Value::Null) => None,
            Some(Value::String(path)) => Some(path),
            Some(other) => return Self::rejected(format!("path must be a string, got {}", other)),
        };

        Self { path, fields: map.into_iter().collect(), invalid: None }
    }
}

/// Accepted shapes of a request file
#[derive(Deserialize)]
#[serde(untagged)]
enum RequestFile {
    List(Vec<UpdateRequest>),
    Wrapped { updates: Vec<UpdateRequest> },
}

impl UpdateRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: Some(path.into()), ..Self::default() }
    }

    fn rejected(reason: String) -> Self {
        Self { invalid: Some(reason), ..Self::default() }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), Value::String(value.into()));
        self
    }

    /// Target path, if one was given and is not blank
    pub fn target(&self) -> Option<&str> {
        self.path.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    /// Non-blank values keyed by canonical field name, in schema order
    pub fn patch(&self, schema: &FieldSchema) -> Vec<(String, String)> {
        let mut resolved: Vec<(usize, String, String)> = Vec::new();

        for (key, value) in &self.fields {
            let Some(field) = schema.resolve(key) else {
                debug!("Ignoring unknown field '{}' in update for {:?}", key, self.path);
                continue;
            };

            let text = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => continue,
                other => {
                    debug!("Ignoring non-scalar value for '{}': {}", key, other);
                    continue;
                }
            };
            if text.is_empty() {
                continue;
            }

            let position = schema.position(&field.name).unwrap_or(usize::MAX);
            match resolved.iter_mut().find(|(_, name, _)| *name == field.name) {
                Some(slot) => slot.2 = text,
                None => resolved.push((position, field.name.clone(), text)),
            }
        }

        resolved.sort_by_key(|(position, _, _)| *position);
        resolved.into_iter().map(|(_, name, value)| (name, value)).collect()
    }

    /// Parse a JSON array of requests, or an object with an `updates` array
    pub fn parse_list(content: &str) -> serde_json::Result<Vec<UpdateRequest>> {
        let parsed: RequestFile = serde_json::from_str(content)?;
        Ok(match parsed {
            RequestFile::List(list) => list,
            RequestFile::Wrapped { updates } => updates,
        })
    }

    /// Load a request file dropped on disk
    pub fn load_file(path: &Path) -> Result<Vec<UpdateRequest>> {
        let content = std::fs::read_to_string(path).map_err(|e| MetadataError::RequestFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::parse_list(&content).map_err(|e| MetadataError::RequestFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
