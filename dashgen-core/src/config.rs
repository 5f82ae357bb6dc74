//! Configuration for dashgen
//!
//! Every entry point takes a [`DashConfig`] explicitly, so readers, writers and
//! renderers can be pointed at temporary directories in tests.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::schema::FieldSchema;

/// Default file name looked up by the CLI
pub const DEFAULT_CONFIG_FILE: &str = "dashgen.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file {path:?}: {source}")]
    Write { path: PathBuf, source: std::io::Error },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Directory that is scanned for source files
    pub root: PathBuf,
    /// File extensions (without dot) that are scanned
    pub extensions: Vec<String>,
    /// Number of leading lines inspected for metadata comments
    pub field_window: usize,
    /// Field after which newly added fields are inserted
    pub anchor_field: String,
    /// Topic used for files sitting directly in the root
    pub default_topic: String,
    /// Markdown table output
    pub readme_path: PathBuf,
    /// HTML dashboard output
    pub html_path: PathBuf,
    /// Page title for rendered outputs
    pub title: String,
    /// Recognised fields, in display order
    pub schema: FieldSchema,
    pub server: ServerSettings,
    pub publish: PublishSettings,
}

/// HTTP transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address the dashboard server binds to
    pub bind: String,
    /// Environment variable holding the shared admin token
    pub admin_token_env: String,
}

/// Version-control publishing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishSettings {
    /// Commit (and push when a token is available) after a successful apply
    pub enabled: bool,
    pub remote: String,
    pub branch: String,
    /// Environment variable holding the push token
    pub token_env: String,
    /// Commit message
    pub message: String,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dsa"),
            extensions: vec!["java".to_string()],
            field_window: 50,
            anchor_field: "Problem".to_string(),
            default_topic: "general".to_string(),
            readme_path: PathBuf::from("README.md"),
            html_path: PathBuf::from("index.html"),
            title: "DSA Dashboard".to_string(),
            schema: FieldSchema::default(),
            server: ServerSettings::default(),
            publish: PublishSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: "127.0.0.1:5000".to_string(), admin_token_env: "ADMIN_TOKEN".to_string() }
    }
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            remote: "origin".to_string(),
            branch: "master".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            message: "auto: dashboard update".to_string(),
        }
    }
}

impl DashConfig {
    /// Configuration rooted at `root`, everything else default
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), ..Self::default() }
    }

    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

        let config: Self = toml::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        std::fs::write(path, content)
            .map_err(|source| ConfigError::Write { path: path.to_path_buf(), source })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.field_window == 0 {
            return Err(ConfigError::Invalid("field_window must be at least 1".to_string()));
        }
        if self.schema.is_empty() {
            return Err(ConfigError::Invalid("schema must list at least one field".to_string()));
        }
        if self.schema.get(&self.anchor_field).is_none() {
            return Err(ConfigError::Invalid(format!(
                "anchor field '{}' is not part of the schema",
                self.anchor_field
            )));
        }
        Ok(())
    }

    /// Whether `path` has one of the scanned extensions
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.trim_start_matches('.') == ext))
            .unwrap_or(false)
    }
}
