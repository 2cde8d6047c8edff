//! Resync command - Wipe the remote workspace and mirror from scratch

use anyhow::Result;
use clap::Args;
use drimesync_sync::PassOptions;

use super::sync::{run_pass, MirrorArgs};
use super::CommandContext;

/// `sync --force-resync` behind an explicit confirmation
#[derive(Debug, Args)]
pub struct ResyncCommand {
    /// Confirm that every entry of the remote workspace will be deleted
    #[arg(long)]
    pub yes: bool,

    #[command(flatten)]
    pub mirror: MirrorArgs,
}

impl ResyncCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        if !self.yes {
            let formatter = ctx.formatter();
            let workspace = self
                .mirror
                .apply(ctx.load_config())
                .mirror
                .workspace_id;
            formatter.error(&format!(
                "resync permanently deletes every entry in workspace {}",
                workspace
            ));
            formatter.info("Re-run with --yes to confirm.");
            return Ok(());
        }

        run_pass(
            ctx,
            &self.mirror,
            PassOptions {
                dry_run: false,
                force_resync: true,
            },
        )
        .await
    }
}
