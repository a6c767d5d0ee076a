use clap::Subcommand;
use std::path::PathBuf;

pub mod cfg;
pub mod definitions;
pub mod execute;
pub mod gla;
pub mod glm;
pub mod validate;

use definitions::{CfgCommands, GlaCommands, GlmCommands};

#[derive(Subcommand)]
pub enum Commands {
    /// Skeleton and animation (.gla) commands
    Gla {
        #[command(subcommand)]
        command: GlaCommands,
    },

    /// Model (.glm) commands
    Glm {
        #[command(subcommand)]
        command: GlmCommands,
    },

    /// animation.cfg commands
    Cfg {
        #[command(subcommand)]
        command: CfgCommands,
    },

    /// Decode every .gla/.glm below a directory and report failures
    Validate {
        /// Directory to scan
        dir: PathBuf,

        /// Write the full report to a JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },
}
