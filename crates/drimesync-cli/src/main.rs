//! DrimeSync CLI - Command-line interface for DrimeSync
//!
//! Provides commands for:
//! - Running a mirror pass (optionally as a dry run)
//! - Wiping and re-uploading the remote workspace
//! - Viewing and editing configuration
//! - Managing the exclusion pattern file
//! - Sharing the encryption salt with another device

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use drimesync_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    config::ConfigCommand, exclusions::ExclusionsCommand, resync::ResyncCommand,
    salt::SaltCommand, sync::SyncCommand, CommandContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "drimesync",
    version,
    about = "One-way encrypted mirror of a local folder to Drime Cloud"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit log lines as JSON on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Mirror the local root to the remote workspace
    Sync(SyncCommand),
    /// Delete everything in the remote workspace, then mirror from scratch
    Resync(ResyncCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// View and reset the exclusion pattern file
    #[command(subcommand)]
    Exclusions(ExclusionsCommand),
    /// Export or import the key derivation salt
    #[command(subcommand)]
    Salt(SaltCommand),
}

fn init_tracing(cli: &Cli, config_level: &str) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "warn",
        (false, 0) => config_level,
        (false, 1) => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config_level = Config::load_or_default(&config_path).logging.level;
    init_tracing(&cli, &config_level);

    let ctx = CommandContext {
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        },
        config_path,
        quiet: cli.quiet,
    };

    match &cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::Resync(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Exclusions(cmd) => cmd.execute(&ctx).await,
        Commands::Salt(cmd) => cmd.execute(&ctx).await,
    }
}
