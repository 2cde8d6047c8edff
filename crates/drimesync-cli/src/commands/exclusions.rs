//! Exclusions command - Inspect and reset the exclusion pattern file

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use drimesync_sync::exclusions::{write_default_file, ExclusionSet};

use super::CommandContext;

/// Exclusions subcommands
#[derive(Debug, Subcommand)]
pub enum ExclusionsCommand {
    /// List the active patterns, creating the file if it is missing
    Show,
    /// Write the default pattern file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Report whether a relative path would be skipped
    Check {
        /// Path relative to the mirror root, `/`-separated
        path: String,
        /// Treat the path as a directory
        #[arg(long)]
        dir: bool,
    },
}

impl ExclusionsCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let path = ctx.load_config().exclusion_path();
        match self {
            ExclusionsCommand::Show => show(ctx, &path),
            ExclusionsCommand::Init { force } => init(ctx, &path, *force),
            ExclusionsCommand::Check { path: target, dir } => check(ctx, &path, target, *dir),
        }
    }
}

fn show(ctx: &CommandContext, path: &Path) -> Result<()> {
    let formatter = ctx.formatter();
    ExclusionSet::load_or_init(path)?;
    let patterns = read_patterns(path)?;

    if ctx.is_json() {
        formatter.print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "patterns": patterns,
        }));
    } else {
        formatter.success(&format!(
            "{} exclusion pattern{} ({})",
            patterns.len(),
            if patterns.len() == 1 { "" } else { "s" },
            path.display()
        ));
        for pattern in &patterns {
            formatter.info(pattern);
        }
    }
    Ok(())
}

fn init(ctx: &CommandContext, path: &Path, force: bool) -> Result<()> {
    let formatter = ctx.formatter();
    if path.exists() && !force {
        formatter.error(&format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
        return Ok(());
    }

    write_default_file(path)?;

    if ctx.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "path": path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Default exclusions written to {}", path.display()));
    }
    Ok(())
}

fn check(ctx: &CommandContext, path: &Path, target: &str, is_dir: bool) -> Result<()> {
    let formatter = ctx.formatter();
    let set = ExclusionSet::load_or_init(path)?;
    let excluded = set.is_excluded(target.trim_matches('/'), is_dir);

    if ctx.is_json() {
        formatter.print_json(&serde_json::json!({
            "path": target,
            "excluded": excluded,
        }));
    } else if excluded {
        formatter.success(&format!("{} is excluded", target));
    } else {
        formatter.success(&format!("{} is mirrored", target));
    }
    Ok(())
}

/// Active pattern lines, without comments and blanks
fn read_patterns(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}
