//! Command execution implementations

use super::Commands;
use super::definitions::{CfgCommands, GlaCommands, GlmCommands};
use super::{cfg, gla, glm, validate};

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Gla { command } => command.execute(),
            Commands::Glm { command } => command.execute(),
            Commands::Cfg { command } => command.execute(),
            Commands::Validate { dir, output, quiet } => {
                validate::execute(dir, output.as_deref(), *quiet)
            }
        }
    }
}

impl GlaCommands {
    /// Execute the selected GLA command.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, decoded or written.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            GlaCommands::Inspect { path, output } => gla::inspect(path, output.as_deref()),
            GlaCommands::Frames {
                path,
                start,
                count,
                quiet,
            } => gla::frames(path, *start, *count, *quiet),
            GlaCommands::Repack {
                source,
                destination,
            } => gla::repack(source, destination),
        }
    }
}

impl GlmCommands {
    /// Execute the selected GLM command.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, decoded or written.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            GlmCommands::Inspect { path, output } => glm::inspect(path, output.as_deref()),
            GlmCommands::Repack {
                source,
                destination,
            } => glm::repack(source, destination),
        }
    }
}

impl CfgCommands {
    /// Execute the selected animation.cfg command.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or, in strict mode, parsed.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            CfgCommands::Show { path, strict } => cfg::show(path, *strict),
        }
    }
}
