//! Subcommand enum definitions for CLI

use clap::Subcommand;
use std::path::PathBuf;

/// GLA skeleton/animation commands
#[derive(Subcommand)]
pub enum GlaCommands {
    /// Inspect a GLA file and display its skeleton
    Inspect {
        /// GLA file to inspect
        path: PathBuf,

        /// Output to JSON file (prints to CLI if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a window of frames and print root bone positions
    Frames {
        /// GLA file
        path: PathBuf,

        /// First frame to decode
        #[arg(short, long, default_value_t = 0)]
        start: usize,

        /// Number of frames to decode
        #[arg(short, long, default_value_t = 1)]
        count: usize,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Decode and re-encode a GLA file
    Repack {
        /// Source GLA file
        source: PathBuf,

        /// Output GLA file
        destination: PathBuf,
    },
}

/// GLM model commands
#[derive(Subcommand)]
pub enum GlmCommands {
    /// Inspect a GLM file and display its surfaces and LODs
    Inspect {
        /// GLM file to inspect
        path: PathBuf,

        /// Output to JSON file (prints to CLI if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode and re-encode a GLM file
    Repack {
        /// Source GLM file
        source: PathBuf,

        /// Output GLM file
        destination: PathBuf,
    },
}

/// animation.cfg commands
#[derive(Subcommand)]
pub enum CfgCommands {
    /// Parse an animation.cfg and print it sorted by start frame
    Show {
        /// animation.cfg file
        path: PathBuf,

        /// Fail on lines that cannot be parsed instead of skipping them
        #[arg(long)]
        strict: bool,
    },
}
