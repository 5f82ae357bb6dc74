pub mod app;
pub mod commands;

pub use app::{Cli, Commands};

use anyhow::{Context, Result};
use dashgen_core::config::DEFAULT_CONFIG_FILE;
use dashgen_core::DashConfig;
use std::path::PathBuf;

impl Cli {
    /// Configuration file in effect
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Load the configuration and apply command-line overrides. An explicit
    /// `--config` must exist; the default file is optional.
    pub fn load_config(&self) -> Result<DashConfig> {
        let path = self.config_path();
        let mut config = match &self.config {
            Some(_) => DashConfig::from_file(&path),
            None => DashConfig::load_or_default(&path),
        }
        .with_context(|| format!("Failed to load configuration from {:?}", path))?;

        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        Ok(config)
    }
}
