//! Salt command - Share the key derivation salt between devices
//!
//! A second device derives the same key only when it uses the same salt,
//! so the salt is exported here and imported on the other machine before
//! its first pass.

use anyhow::{Context, Result};
use clap::Subcommand;
use drimesync_codec::SaltStore;

use super::CommandContext;

/// Salt subcommands
#[derive(Debug, Subcommand)]
pub enum SaltCommand {
    /// Print the salt as URL-safe base64, generating it if missing
    Export,
    /// Replace the local salt with one exported from another device
    Import {
        /// Base64 salt printed by `salt export`
        value: String,
    },
}

impl SaltCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let store = SaltStore::new(ctx.load_config().encryption.salt_file);

        match self {
            SaltCommand::Export => {
                let encoded = store.export_base64().context("Failed to export the salt")?;
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "salt": encoded,
                        "path": store.path().display().to_string(),
                    }));
                } else {
                    formatter.success(&encoded);
                }
            }
            SaltCommand::Import { value } => {
                store
                    .import_base64(value)
                    .context("Failed to import the salt")?;
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "success": true,
                        "path": store.path().display().to_string(),
                    }));
                } else {
                    formatter.success(&format!("Salt saved to {}", store.path().display()));
                }
            }
        }
        Ok(())
    }
}
