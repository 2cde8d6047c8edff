//! Config command - View and manage DrimeSync configuration
//!
//! Provides the `drimesync config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Writes a default configuration file
//! 3. Sets individual configuration values via dot-notation keys
//! 4. Validates the configuration file and reports errors

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use drimesync_core::config::Config;
use tracing::info;

use super::CommandContext;

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "transfer.workers")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Init { force } => self.execute_init(ctx, *force),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value),
            ConfigCommand::Validate => self.execute_validate(ctx),
        }
    }

    fn execute_show(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config();

        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if ctx.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    fn execute_init(&self, ctx: &CommandContext, force: bool) -> Result<()> {
        let formatter = ctx.formatter();
        let path = &ctx.config_path;

        if path.exists() && !force {
            formatter.error(&format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            ));
            return Ok(());
        }

        Config::default()
            .save(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "config_path": path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Default configuration written to {}", path.display()));
        }
        Ok(())
    }

    /// Set a configuration value using dot-notation
    fn execute_set(&self, ctx: &CommandContext, key: &str, value: &str) -> Result<()> {
        let formatter = ctx.formatter();
        let mut config = ctx.load_config();

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                for (name, help) in SUPPORTED_KEYS {
                    formatter.info(&format!("  {:<36} - {}", name, help));
                }
            }
            return Ok(());
        }

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": messages,
                }));
            } else {
                formatter.error(&format!(
                    "Invalid value for '{}': {}",
                    key,
                    messages.join("; ")
                ));
            }
            return Ok(());
        }

        config
            .save(&ctx.config_path)
            .context("Failed to write configuration file")?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": ctx.config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", ctx.config_path.display()));
        }
        Ok(())
    }

    /// Validate configuration file
    fn execute_validate(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config_path = &ctx.config_path;

        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                let message = if config_path.exists() {
                    format!("Failed to parse configuration: {}", e)
                } else {
                    "Configuration file not found. Using defaults.".to_string()
                };
                if ctx.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [message],
                    }));
                } else {
                    formatter.error(&message);
                    formatter.info(&format!("File: {}", config_path.display()));
                    formatter.info("Run 'drimesync config init' to create one.");
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = config.validate();

        if ctx.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        Ok(())
    }
}

const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("mirror.local_root", "Local folder to mirror"),
    ("mirror.workspace_id", "Target remote workspace"),
    ("mirror.mode", "plain|content_only|partial|full"),
    ("mirror.use_exclusions", "true|false"),
    ("mirror.state_dir", "Snapshot and exclusion file directory"),
    ("transfer.workers", "Parallel transfer workers"),
    ("transfer.simple_upload_concurrency", "Concurrent small uploads (none = workers)"),
    ("transfer.multipart_threshold_mb", "Multipart threshold (MiB)"),
    ("transfer.chunk_size_mb", "Multipart part size (MiB)"),
    ("transfer.file_attempts", "Attempts per file"),
    ("api.base_url", "Drime API endpoint"),
    ("api.timeout_secs", "Request timeout in seconds"),
    ("api.api_key_env", "Environment variable holding the API key"),
    ("encryption.password_env", "Environment variable holding the password"),
    ("encryption.salt_file", "Key derivation salt file"),
    ("logging.level", "trace|debug|info|warn|error"),
];

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- mirror ---
        "mirror.local_root" => config.mirror.local_root = PathBuf::from(value),
        "mirror.workspace_id" => config.mirror.workspace_id = value.to_string(),
        "mirror.mode" => {
            config.mirror.mode = value
                .parse()
                .with_context(|| format!("Unknown mode '{}'", value))?;
        }
        "mirror.use_exclusions" => {
            config.mirror.use_exclusions = value
                .parse::<bool>()
                .context("Expected true or false for mirror.use_exclusions")?;
        }
        "mirror.state_dir" => config.mirror.state_dir = PathBuf::from(value),

        // --- transfer ---
        "transfer.workers" => {
            config.transfer.workers = value
                .parse::<usize>()
                .context("Expected a positive integer for transfer.workers")?;
        }
        "transfer.simple_upload_concurrency" => {
            config.transfer.simple_upload_concurrency = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.parse::<usize>().context("Expected a positive integer")?)
            };
        }
        "transfer.multipart_threshold_mb" => {
            config.transfer.multipart_threshold_mb = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }
        "transfer.chunk_size_mb" => {
            config.transfer.chunk_size_mb = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }
        "transfer.file_attempts" => {
            config.transfer.file_attempts = value
                .parse::<u32>()
                .context("Expected a positive integer")?;
        }

        // --- api ---
        "api.base_url" => config.api.base_url = value.to_string(),
        "api.timeout_secs" => {
            config.api.timeout_secs = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }
        "api.api_key_env" => config.api.api_key_env = value.to_string(),

        // --- encryption ---
        "encryption.password_env" => config.encryption.password_env = value.to_string(),
        "encryption.salt_file" => config.encryption.salt_file = PathBuf::from(value),

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),

        _ => anyhow::bail!("Unknown configuration key: '{}'", key),
    }

    Ok(())
}
