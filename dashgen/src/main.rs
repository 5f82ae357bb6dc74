use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Parse CLI arguments first to get verbosity level
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match &cli.command {
        Commands::Init(args) => {
            info!("Init command: {:?}", args);
            let path = cli.config_path();
            cli::commands::init::execute(args.clone(), &path, cli.root.as_deref())?;
        }
        Commands::Scan(args) => {
            info!("Scan command: {:?}", args);
            cli::commands::scan::execute(args.clone(), cli.load_config()?)?;
        }
        Commands::Render(args) => {
            info!("Render command: {:?}", args);
            cli::commands::render::execute(args.clone(), cli.load_config()?)?;
        }
        Commands::Apply(args) => {
            info!("Apply command: {:?}", args);
            let report = cli::commands::apply::execute(args.clone(), cli.load_config()?)?;
            if !report.is_success() {
                std::process::exit(1);
            }
        }
        Commands::Serve(args) => {
            info!("Serve command: {:?}", args);
            cli::commands::serve::execute(args.clone(), cli.load_config()?)?;
        }
    }

    Ok(())
}
