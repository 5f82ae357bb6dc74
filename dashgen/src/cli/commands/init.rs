//! Init command: write a default configuration file

use anyhow::{Context, Result};
use dashgen_core::DashConfig;
use std::path::Path;
use tracing::info;

use crate::cli::app::InitArgs;

pub fn execute(args: InitArgs, path: &Path, root: Option<&Path>) -> Result<()> {
    if path.exists() && !args.force {
        anyhow::bail!("{} already exists, use --force to overwrite", path.display());
    }

    let config = match root {
        Some(root) => DashConfig::with_root(root),
        None => DashConfig::default(),
    };
    config.save(path).with_context(|| format!("Failed to write {:?}", path))?;

    info!("Initialized configuration at {:?}", path);
    println!("Wrote {}", path.display());
    println!("Source files are read from {}", config.root.display());
    Ok(())
}
