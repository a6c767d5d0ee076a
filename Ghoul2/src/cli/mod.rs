//! Ghoul2 CLI - Command-line interface for Ghoul2 model tools

pub mod commands;
pub mod progress;

use clap::Parser;
use commands::Commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ghoul2")]
#[command(about = "Ghoul2: .gla/.glm model tools for Jedi Academy", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Run the Ghoul2 CLI
///
/// # Errors
/// Returns an error if the selected command fails.
pub fn run_cli() -> anyhow::Result<()> {
    // Setup logging, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli.command.execute()?;

    Ok(())
}
