//! Recognised metadata fields
//!
//! The schema is the single place where field names live. Parsing, insertion
//! and rendering all walk it in order.

use serde::{Deserialize, Serialize};

/// A single recognised `// Name: value` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name as it appears in the comment, e.g. `Level`
    pub name: String,
    /// Value used when the field is missing from a file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), default: None }
    }

    pub fn with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self { name: name.into(), default: Some(default.into()) }
    }

    pub fn default_value(&self) -> &str {
        self.default.as_deref().unwrap_or("")
    }
}

/// Ordered list of recognised fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema {
    fields: Vec<FieldDef>,
}

impl FieldSchema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self { fields }
    }

    /// Build a schema from bare names, none of which carry a default
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { fields: names.into_iter().map(FieldDef::new).collect() }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Exact lookup, used when matching comment lines
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Case-insensitive lookup, used for update requests (`level` -> `Level`)
    pub fn resolve(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::from_names(["Problem", "Level", "Revisit", "Notes"])
    }
}
