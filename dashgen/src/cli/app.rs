use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "dashgen",
    version,
    about = "Dashgen - Build a practice dashboard from metadata comments",
    long_about = "Dashgen scans source files for leading `// Key: value` comments, renders them as a Markdown table and an editable HTML dashboard, and writes edits back into the comments."
)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the scanned root directory
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List extracted records
    #[command(about = "Scan the root directory and print the extracted records")]
    Scan(ScanArgs),

    /// Write dashboard outputs
    #[command(about = "Regenerate the Markdown table, HTML dashboard or JSON dump")]
    Render(RenderArgs),

    /// Apply a request file
    #[command(about = "Apply a JSON file of metadata updates to the source files")]
    Apply(ApplyArgs),

    /// Serve the editable dashboard
    #[command(about = "Serve the dashboard and accept edits over HTTP")]
    Serve(ServeArgs),

    /// Write a default configuration file
    #[command(about = "Write a dashgen.toml with default settings")]
    Init(InitArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ScanArgs {
    /// Print records as JSON
    #[arg(long, help = "Print records as JSON instead of a table")]
    pub json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RenderArgs {
    /// Output format (markdown, html, json, all)
    #[arg(short, long, default_value = "all", help = "Output format to write")]
    pub format: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ApplyArgs {
    /// Request file holding a list of updates
    #[arg(help = "JSON file with a list of {path, field: value} updates")]
    pub file: PathBuf,

    /// Keep the request file after applying it
    #[arg(long, help = "Do not delete the request file afterwards")]
    pub keep: bool,

    /// Skip regenerating outputs
    #[arg(long, help = "Do not regenerate README and dashboard")]
    pub no_render: bool,

    /// Commit and push when publishing is configured
    #[arg(long, help = "Publish regenerated outputs to git")]
    pub publish: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Bind address, overrides the configured one
    #[arg(short, long, help = "Address to listen on")]
    pub bind: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}
