//! Render command: regenerate dashboard outputs from disk

use anyhow::Result;
use dashgen_core::{DashConfig, Dashboard, RenderFormat};
use tracing::info;

use crate::cli::app::RenderArgs;

pub fn execute(args: RenderArgs, config: DashConfig) -> Result<()> {
    let formats = parse_formats(&args.format)?;
    let dashboard = Dashboard::new(config)?;

    let outputs = dashboard.render(&formats)?;
    for path in &outputs {
        println!("Wrote {}", path.display());
    }
    info!("Rendered {} outputs", outputs.len());
    Ok(())
}

/// `all` or a comma-separated list of formats
pub fn parse_formats(value: &str) -> Result<Vec<RenderFormat>> {
    if value.eq_ignore_ascii_case("all") {
        return Ok(RenderFormat::all());
    }

    let mut formats = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let format: RenderFormat = part.parse()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }

    if formats.is_empty() {
        anyhow::bail!("No output format given");
    }
    Ok(formats)
}
