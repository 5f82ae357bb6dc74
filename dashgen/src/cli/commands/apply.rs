//! Apply command: write a request file back into the source comments

use anyhow::{Context, Result};
use dashgen_core::{BatchReport, DashConfig, Dashboard, PublishOutcome, RenderFormat};
use tracing::{info, warn};

use crate::cli::app::ApplyArgs;

/// Returns the batch report so the caller can pick the exit status
pub fn execute(args: ApplyArgs, config: DashConfig) -> Result<BatchReport> {
    let dashboard = Dashboard::new(config)?;

    let report = dashboard
        .driver()
        .apply_request_file(&args.file, !args.keep)
        .with_context(|| format!("Failed to apply {:?}", args.file))?;

    let formats = if args.no_render {
        Vec::new()
    } else {
        vec![RenderFormat::Markdown, RenderFormat::Html]
    };
    let result = dashboard.finish(report, &formats, args.publish)?;

    print_report(&result.report);
    for path in &result.outputs {
        println!("Wrote {}", path.display());
    }
    match &result.publish {
        PublishOutcome::Committed { commit, pushed } => {
            println!("Committed {}{}", commit, if *pushed { " and pushed" } else { "" });
        }
        PublishOutcome::NothingToCommit => println!("Nothing to publish"),
        PublishOutcome::Skipped(reason) if args.publish => warn!("Publish skipped: {}", reason),
        PublishOutcome::Skipped(_) => {}
    }

    info!("Apply of {:?} finished", args.file);
    Ok(result.report)
}

fn print_report(report: &BatchReport) {
    println!("{}", report.summary());
    for entry in &report.skipped {
        println!(
            "  skipped #{} ({}): {}",
            entry.index,
            entry.path.as_deref().unwrap_or("<no path>"),
            entry.reason
        );
    }
}
