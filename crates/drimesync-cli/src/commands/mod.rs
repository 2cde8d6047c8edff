//! CLI subcommands

pub mod config;
pub mod exclusions;
pub mod resync;
pub mod salt;
pub mod sync;

use std::path::PathBuf;

use drimesync_core::config::Config;

use crate::output::{ConsoleFormatter, OutputFormat, OutputFormatter};

/// Global options shared by every subcommand
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Selected output format
    pub format: OutputFormat,
    /// Configuration file in use
    pub config_path: PathBuf,
    /// Suppress everything but errors
    pub quiet: bool,
}

impl CommandContext {
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Formatter for command results
    ///
    /// Results are printed even with `--quiet`; only engine chatter is muted.
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        Box::new(ConsoleFormatter::new(self.format, false))
    }

    /// Loads the configuration, falling back to defaults
    pub fn load_config(&self) -> Config {
        Config::load_or_default(&self.config_path)
    }
}
