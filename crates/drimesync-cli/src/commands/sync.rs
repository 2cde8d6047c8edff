//! Sync command - Mirror the local root to Drime Cloud
//!
//! Provides the `drimesync sync` CLI command which:
//! 1. Loads configuration and applies command-line overrides
//! 2. Builds the Drime API adapter from the API key in the environment
//! 3. Derives the content key when the mode encrypts anything
//! 4. Runs one mirror pass; Ctrl-C requests cancellation
//! 5. Displays the pass report

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use drimesync_api::{DrimeClient, DrimeRemote};
use drimesync_codec::{derive_key, EncryptionKey, PathCodec, SaltStore};
use drimesync_core::config::{Config, ConfigBuilder};
use drimesync_core::domain::{report::format_size, ConfidentialityMode, ExecutionReport, PassStatus};
use drimesync_core::ports::IRemoteApi;
use drimesync_sync::{MirrorOrchestrator, PassOptions};
use tracing::{info, warn};

use super::CommandContext;
use crate::output::{ConsoleObserver, OutputFormatter};

/// Overrides for the mirror section of the configuration
#[derive(Debug, Clone, Default, Args)]
pub struct MirrorArgs {
    /// Confidentiality mode: plain, content_only, partial or full
    #[arg(long)]
    pub mode: Option<ConfidentialityMode>,

    /// Number of parallel transfer workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// Local folder to mirror
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Target remote workspace id
    #[arg(long)]
    pub workspace: Option<String>,
}

impl MirrorArgs {
    /// Returns `config` with the given overrides applied
    pub fn apply(&self, config: Config) -> Config {
        let mut builder = ConfigBuilder::from_config(config);
        if let Some(mode) = self.mode {
            builder = builder.mode(mode);
        }
        if let Some(workers) = self.workers {
            builder = builder.workers(workers);
        }
        if let Some(root) = &self.root {
            builder = builder.local_root(root.clone());
        }
        if let Some(workspace) = &self.workspace {
            builder = builder.workspace_id(workspace.clone());
        }
        builder.build()
    }
}

/// Run one mirror pass
#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Delete every remote entry and the local state before mirroring
    #[arg(long)]
    pub force_resync: bool,

    #[command(flatten)]
    pub mirror: MirrorArgs,
}

impl SyncCommand {
    /// Execute the sync command
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        run_pass(
            ctx,
            &self.mirror,
            PassOptions {
                dry_run: self.dry_run,
                force_resync: self.force_resync,
            },
        )
        .await
    }
}

/// Builds the collaborators and runs a single pass
pub(crate) async fn run_pass(
    ctx: &CommandContext,
    overrides: &MirrorArgs,
    options: PassOptions,
) -> Result<()> {
    let formatter = ctx.formatter();
    let config = overrides.apply(ctx.load_config());
    info!(config_path = %ctx.config_path.display(), "Loaded configuration");

    let errors = config.validate();
    if !errors.is_empty() {
        for error in &errors {
            formatter.error(&error.to_string());
        }
        anyhow::bail!(
            "Configuration has {} error{}",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        );
    }

    let remote = build_remote(&config)?;
    let codec = build_codec(&config).await?;
    let observer = Arc::new(ConsoleObserver::new(ctx.format, ctx.quiet));
    let mut orchestrator = MirrorOrchestrator::new(config.clone(), remote, Arc::new(codec), observer);

    let control = orchestrator.control();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after in-flight transfers");
            control.cancel();
        }
    });

    if options.dry_run && !ctx.quiet {
        formatter.info("Dry run mode - no changes will be made");
    }
    formatter.info(&format!(
        "Mirroring {} to workspace {} ({})",
        config.mirror.local_root.display(),
        config.mirror.workspace_id,
        config.mirror.mode
    ));

    let result = orchestrator.run(options).await;
    interrupt.abort();
    let report = result.context("Mirror pass failed")?;

    print_report(formatter.as_ref(), ctx.is_json(), &report)
}

/// Creates the Drime adapter from the configured API key variable
fn build_remote(config: &Config) -> Result<Arc<dyn IRemoteApi>> {
    let api_key = std::env::var(&config.api.api_key_env)
        .with_context(|| format!("Set {} to your Drime API key", config.api.api_key_env))?;
    let client = DrimeClient::with_options(
        api_key,
        config.api.base_url.clone(),
        Duration::from_secs(config.api.timeout_secs),
    )
    .context("Failed to create the Drime API client")?;
    Ok(Arc::new(DrimeRemote::new(client)))
}

/// Creates the path codec, deriving the key for encrypting modes
async fn build_codec(config: &Config) -> Result<PathCodec> {
    let mode = config.mirror.mode;
    if !mode.requires_key() {
        return Ok(PathCodec::new(mode, None)?);
    }

    let password = std::env::var(&config.encryption.password_env).with_context(|| {
        format!(
            "Mode '{}' needs the encryption password in {}",
            mode, config.encryption.password_env
        )
    })?;
    let salt_file = config.encryption.salt_file.clone();

    let key = tokio::task::spawn_blocking(move || -> Result<EncryptionKey> {
        let salt = SaltStore::new(salt_file).load_or_generate()?;
        Ok(derive_key(&password, &salt)?)
    })
    .await
    .context("Key derivation task failed")??;

    Ok(PathCodec::new(mode, Some(key))?)
}

fn print_report(
    formatter: &dyn OutputFormatter,
    json: bool,
    report: &ExecutionReport,
) -> Result<()> {
    if json {
        let value = serde_json::to_value(report).context("Failed to serialize the report")?;
        formatter.print_json(&value);
        return Ok(());
    }

    let duration_display = if report.duration_ms >= 1000 {
        format!("{:.1}s", report.duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", report.duration_ms)
    };

    match &report.status {
        PassStatus::Completed if report.planned == 0 => formatter.success("Already up to date"),
        PassStatus::Completed => {
            formatter.success(&format!("Mirror completed in {}", duration_display))
        }
        PassStatus::DryRun => formatter.success(&format!(
            "Dry run: {} operation{} planned, {} to upload",
            report.planned,
            if report.planned == 1 { "" } else { "s" },
            format_size(report.bytes_transferred)
        )),
        PassStatus::Cancelled => formatter.warn("Mirror cancelled, progress saved"),
        PassStatus::Failed(reason) => formatter.error(reason),
    }

    for line in report.render_text().lines().skip(1) {
        formatter.info(line);
    }
    if report.failed > 0 {
        formatter.error(&format!(
            "{} item{} failed and will be retried on the next pass",
            report.failed,
            if report.failed == 1 { "" } else { "s" }
        ));
    }
    Ok(())
}
