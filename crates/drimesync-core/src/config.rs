//! Configuration module for DrimeSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//!
//! Secrets are never stored in the file: the API key and the encryption
//! password are read from the environment variables named in `api` and
//! `encryption`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::mode::ConfidentialityMode;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for DrimeSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mirror: MirrorConfig,
    pub transfer: TransferConfig,
    pub api: ApiConfig,
    pub encryption: EncryptionConfig,
    pub logging: LoggingConfig,
}

/// What is mirrored and where.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Local directory mirrored to the remote workspace.
    pub local_root: PathBuf,
    /// Remote workspace id; `"0"` is the personal workspace.
    pub workspace_id: String,
    /// Confidentiality mode applied to names and content.
    pub mode: ConfidentialityMode,
    /// Whether the `_drimeexclude` patterns are applied while scanning.
    pub use_exclusions: bool,
    /// Directory holding the local snapshot and the exclusion file.
    pub state_dir: PathBuf,
}

/// Transfer executor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Number of concurrent transfer workers.
    pub workers: usize,
    /// Concurrent single-request uploads; defaults to `workers`.
    pub simple_upload_concurrency: Option<usize>,
    /// Files above this size (in MiB) are uploaded in parts.
    pub multipart_threshold_mb: u64,
    /// Size of each multipart part (in MiB).
    pub chunk_size_mb: u64,
    /// Number of part URLs requested per signing call.
    pub sign_batch_size: usize,
    /// Retries for a single part PUT.
    pub part_retries: u32,
    /// Attempts for a whole file upload on retryable errors.
    pub file_attempts: u32,
    /// Attempts for publishing the snapshot.
    pub snapshot_publish_attempts: u32,
    /// Seconds between snapshot publish attempts.
    pub snapshot_retry_delay_secs: u64,
    /// Scratch directory for encrypted upload copies; system temp dir if unset.
    pub temp_dir: Option<PathBuf>,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the REST API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

/// Encryption key material settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// Environment variable holding the encryption password.
    pub password_env: String,
    /// File holding the 16-byte Argon2 salt.
    pub salt_file: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drimesync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("drimesync")
            .join("config.yaml")
    }

    /// Effective simple-upload concurrency.
    pub fn simple_upload_concurrency(&self) -> usize {
        self.transfer
            .simple_upload_concurrency
            .unwrap_or(self.transfer.workers)
    }

    /// Multipart threshold in bytes.
    pub fn multipart_threshold_bytes(&self) -> u64 {
        self.transfer.multipart_threshold_mb * 1024 * 1024
    }

    /// Part size in bytes.
    pub fn chunk_size_bytes(&self) -> u64 {
        self.transfer.chunk_size_mb * 1024 * 1024
    }

    /// State directory of the configured workspace and mode.
    ///
    /// Each `(workspace_id, mode)` pair keeps its own snapshot, e.g.
    /// `<state_dir>/0_full/`.
    pub fn workspace_state_dir(&self) -> PathBuf {
        let workspace: String = self
            .mirror
            .workspace_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.mirror
            .state_dir
            .join(format!("{}_{}", workspace, self.mirror.mode))
    }

    /// Path of the local snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.workspace_state_dir().join(SNAPSHOT_FILE_NAME)
    }

    /// Path of the exclusion pattern file, shared by every workspace.
    pub fn exclusion_path(&self) -> PathBuf {
        self.mirror.state_dir.join(EXCLUSION_FILE_NAME)
    }
}

/// File name of the local and remote snapshot.
pub const SNAPSHOT_FILE_NAME: &str = "00_drime_cloud_tree.json";

/// File name of the exclusion pattern list.
pub const EXCLUSION_FILE_NAME: &str = "_drimeexclude";

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("drimesync")
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            local_root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("DrimeSync"),
            workspace_id: "0".to_string(),
            mode: ConfidentialityMode::Plain,
            use_exclusions: true,
            state_dir: data_dir().join("state"),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            simple_upload_concurrency: None,
            multipart_threshold_mb: 30,
            chunk_size_mb: 25,
            sign_batch_size: 10,
            part_retries: 3,
            file_attempts: 3,
            snapshot_publish_attempts: 10,
            snapshot_retry_delay_secs: 2,
            temp_dir: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            api_key_env: "DRIME_API_KEY".to_string(),
        }
    }
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            password_env: "DRIMESYNC_PASSWORD".to_string(),
            salt_file: data_dir().join("E2EE_sync_salt.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://app.drime.cloud/api/v1";

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"transfer.workers"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Smallest part size accepted by the object store (in MiB).
const MIN_CHUNK_SIZE_MB: u64 = 5;

/// Upper bound for `transfer.workers`.
const MAX_WORKERS: usize = 64;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: String| {
            errors.push(ValidationError {
                field: field.into(),
                message,
            })
        };

        // --- mirror ---
        if self.mirror.workspace_id.trim().is_empty() {
            push("mirror.workspace_id", "must not be empty".into());
        }
        if self.mirror.local_root.as_os_str().is_empty() {
            push("mirror.local_root", "must not be empty".into());
        }

        // --- transfer ---
        let t = &self.transfer;
        if t.workers == 0 || t.workers > MAX_WORKERS {
            push(
                "transfer.workers",
                format!("must be in range 1..={}", MAX_WORKERS),
            );
        }
        if t.simple_upload_concurrency == Some(0) {
            push(
                "transfer.simple_upload_concurrency",
                "must be greater than 0".into(),
            );
        }
        if t.multipart_threshold_mb == 0 {
            push(
                "transfer.multipart_threshold_mb",
                "must be greater than 0".into(),
            );
        }
        if t.chunk_size_mb < MIN_CHUNK_SIZE_MB {
            push(
                "transfer.chunk_size_mb",
                format!("must be at least {} MiB", MIN_CHUNK_SIZE_MB),
            );
        }
        if t.chunk_size_mb > t.multipart_threshold_mb {
            push(
                "transfer.chunk_size_mb",
                format!(
                    "chunk_size_mb ({}) must not exceed multipart_threshold_mb ({})",
                    t.chunk_size_mb, t.multipart_threshold_mb
                ),
            );
        }
        if t.sign_batch_size == 0 {
            push("transfer.sign_batch_size", "must be greater than 0".into());
        }
        if t.file_attempts == 0 {
            push("transfer.file_attempts", "must be greater than 0".into());
        }
        if t.snapshot_publish_attempts == 0 {
            push(
                "transfer.snapshot_publish_attempts",
                "must be greater than 0".into(),
            );
        }

        // --- api ---
        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://"))
        {
            push(
                "api.base_url",
                format!("must start with http:// or https://: {}", self.api.base_url),
            );
        }
        if self.api.timeout_secs == 0 {
            push("api.timeout_secs", "must be greater than 0".into());
        }
        if self.api.api_key_env.trim().is_empty() {
            push("api.api_key_env", "must not be empty".into());
        }

        // --- encryption ---
        if self.mirror.mode.requires_key() && self.encryption.password_env.trim().is_empty() {
            push(
                "encryption.password_env",
                format!("required for mode '{}'", self.mirror.mode),
            );
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            push(
                "logging.level",
                format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use drimesync_core::config::ConfigBuilder;
/// use drimesync_core::domain::ConfidentialityMode;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .local_root(PathBuf::from("/home/user/Documents"))
///     .mode(ConfidentialityMode::Full)
///     .workers(8)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an existing configuration (e.g. one loaded from disk).
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- mirror ---

    pub fn local_root(mut self, root: PathBuf) -> Self {
        self.config.mirror.local_root = root;
        self
    }

    pub fn workspace_id(mut self, id: impl Into<String>) -> Self {
        self.config.mirror.workspace_id = id.into();
        self
    }

    pub fn mode(mut self, mode: ConfidentialityMode) -> Self {
        self.config.mirror.mode = mode;
        self
    }

    pub fn use_exclusions(mut self, enabled: bool) -> Self {
        self.config.mirror.use_exclusions = enabled;
        self
    }

    pub fn state_dir(mut self, dir: PathBuf) -> Self {
        self.config.mirror.state_dir = dir;
        self
    }

    // --- transfer ---

    pub fn workers(mut self, n: usize) -> Self {
        self.config.transfer.workers = n;
        self
    }

    pub fn simple_upload_concurrency(mut self, n: usize) -> Self {
        self.config.transfer.simple_upload_concurrency = Some(n);
        self
    }

    pub fn multipart_threshold_mb(mut self, mb: u64) -> Self {
        self.config.transfer.multipart_threshold_mb = mb;
        self
    }

    pub fn chunk_size_mb(mut self, mb: u64) -> Self {
        self.config.transfer.chunk_size_mb = mb;
        self
    }

    pub fn snapshot_retry_delay_secs(mut self, secs: u64) -> Self {
        self.config.transfer.snapshot_retry_delay_secs = secs;
        self
    }

    // --- api ---

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.api.timeout_secs = secs;
        self
    }

    // --- encryption ---

    pub fn salt_file(mut self, path: PathBuf) -> Self {
        self.config.encryption.salt_file = path;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
