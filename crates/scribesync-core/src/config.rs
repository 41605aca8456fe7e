//! Configuration module for ScribeSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for ScribeSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub vault: VaultConfig,
    pub sync: SyncConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the sync server, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Local vault settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Root directory of the document vault.
    pub root: PathBuf,
    /// Folder names whose files are treated as relationship notes.
    pub people_folders: Vec<String>,
    /// File extensions eligible for sync.
    pub extensions: Vec<String>,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Milliseconds to wait after a filesystem event before acting (debounce).
    pub debounce_ms: u64,
    /// Milliseconds a delete is held back waiting for a matching create
    /// (rename window). Must exceed the debounce, or a slow editor rename
    /// turns into a remote delete plus create.
    pub rename_window_ms: u64,
    /// Number of documents per bulk request chunk.
    pub batch_size: usize,
    /// Attempts per document before it is dropped from the queue.
    pub max_retries: u32,
    /// Documents larger than this (in bytes) are skipped with a validation error.
    pub max_note_bytes: u64,
    /// Conflict resolution policy: `server_wins` or `local_wins`.
    pub conflict_policy: String,
    /// Path to the persisted sync state snapshot.
    pub state_file: PathBuf,
    /// Seconds between periodic full passes while watching.
    #[serde(default = "default_full_sync_interval_secs")]
    pub full_sync_interval_secs: u64,
    /// Delete remote notes whose source file no longer exists locally.
    /// Destructive, so it stays off until explicitly enabled.
    #[serde(default)]
    pub mirror_delete: bool,
}

fn default_full_sync_interval_secs() -> u64 {
    3600
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Seconds before token expiry at which a proactive refresh is scheduled.
    pub refresh_lead_secs: u64,
    /// Service name used for the OS keyring entry.
    pub keyring_service: String,
    /// Plaintext credential file used when no keyring is available.
    pub fallback_file: PathBuf,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Path to the log file. Logs go to stderr only when unset.
    pub file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config::load()
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

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/scribesync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("scribesync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("scribesync")
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: dirs::document_dir()
                .unwrap_or_else(|| PathBuf::from("~/Documents"))
                .join("Vault"),
            people_folders: vec!["People".to_string()],
            extensions: vec!["md".to_string(), "txt".to_string()],
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 2000,
            rename_window_ms: 5000,
            batch_size: 50,
            max_retries: 3,
            max_note_bytes: 1024 * 1024,
            conflict_policy: "server_wins".to_string(),
            state_file: data_dir().join("sync-state.json"),
            full_sync_interval_secs: 3600,
            mirror_delete: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_lead_secs: 3600,
            keyring_service: "scribesync".to_string(),
            fallback_file: data_dir().join("credentials.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.batch_size"`.
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

/// Valid values for `sync.conflict_policy`.
const VALID_CONFLICT_POLICIES: &[&str] = &["server_wins", "local_wins"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- api ---
        if self.api.base_url.trim().is_empty() {
            errors.push(ValidationError {
                field: "api.base_url".into(),
                message: "must not be empty".into(),
            });
        } else if !self.api.base_url.starts_with("http://")
            && !self.api.base_url.starts_with("https://")
        {
            errors.push(ValidationError {
                field: "api.base_url".into(),
                message: format!("must start with http:// or https://: {}", self.api.base_url),
            });
        }
        if self.api.timeout_secs == 0 {
            errors.push(ValidationError {
                field: "api.timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- vault ---
        // Check the vault root only when it does not start with `~` (tilde is
        // expanded at runtime).
        let root_str = self.vault.root.to_string_lossy();
        if !root_str.starts_with('~') && !self.vault.root.exists() {
            errors.push(ValidationError {
                field: "vault.root".into(),
                message: format!("directory does not exist: {}", self.vault.root.display()),
            });
        }
        if self.vault.extensions.is_empty() {
            errors.push(ValidationError {
                field: "vault.extensions".into(),
                message: "must list at least one extension".into(),
            });
        }

        // --- sync ---
        if self.sync.debounce_ms == 0 {
            errors.push(ValidationError {
                field: "sync.debounce_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.rename_window_ms == 0 {
            errors.push(ValidationError {
                field: "sync.rename_window_ms".into(),
                message: "must be greater than 0".into(),
            });
        } else if self.sync.rename_window_ms <= self.sync.debounce_ms {
            errors.push(ValidationError {
                field: "sync.rename_window_ms".into(),
                message: format!(
                    "must be greater than sync.debounce_ms ({}); a shorter window \
                     finalizes rename deletes before their create settles",
                    self.sync.debounce_ms
                ),
            });
        }
        if self.sync.batch_size == 0 || self.sync.batch_size > 100 {
            errors.push(ValidationError {
                field: "sync.batch_size".into(),
                message: "must be in range 1..=100".into(),
            });
        }
        if self.sync.max_retries == 0 {
            errors.push(ValidationError {
                field: "sync.max_retries".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.max_note_bytes == 0 {
            errors.push(ValidationError {
                field: "sync.max_note_bytes".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.full_sync_interval_secs == 0 {
            errors.push(ValidationError {
                field: "sync.full_sync_interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if !VALID_CONFLICT_POLICIES.contains(&self.sync.conflict_policy.as_str()) {
            errors.push(ValidationError {
                field: "sync.conflict_policy".into(),
                message: format!(
                    "invalid policy '{}'; valid options: {}",
                    self.sync.conflict_policy,
                    VALID_CONFLICT_POLICIES.join(", ")
                ),
            });
        }

        // --- auth ---
        if self.auth.refresh_lead_secs == 0 {
            errors.push(ValidationError {
                field: "auth.refresh_lead_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.auth.keyring_service.trim().is_empty() {
            errors.push(ValidationError {
                field: "auth.keyring_service".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
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
/// use scribesync_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .vault_root(PathBuf::from("/home/user/Vault"))
///     .api_base_url("https://notes.example.com")
///     .logging_level("debug")
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

    // --- api ---

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api.timeout_secs = secs;
        self
    }

    // --- vault ---

    pub fn vault_root(mut self, root: PathBuf) -> Self {
        self.config.vault.root = root;
        self
    }

    pub fn vault_people_folders(mut self, folders: Vec<String>) -> Self {
        self.config.vault.people_folders = folders;
        self
    }

    pub fn vault_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.vault.extensions = extensions;
        self
    }

    // --- sync ---

    pub fn sync_debounce_ms(mut self, ms: u64) -> Self {
        self.config.sync.debounce_ms = ms;
        self
    }

    pub fn sync_rename_window_ms(mut self, ms: u64) -> Self {
        self.config.sync.rename_window_ms = ms;
        self
    }

    pub fn sync_batch_size(mut self, n: usize) -> Self {
        self.config.sync.batch_size = n;
        self
    }

    pub fn sync_max_retries(mut self, n: u32) -> Self {
        self.config.sync.max_retries = n;
        self
    }

    pub fn sync_max_note_bytes(mut self, bytes: u64) -> Self {
        self.config.sync.max_note_bytes = bytes;
        self
    }

    pub fn sync_conflict_policy(mut self, policy: impl Into<String>) -> Self {
        self.config.sync.conflict_policy = policy.into();
        self
    }

    pub fn sync_state_file(mut self, path: PathBuf) -> Self {
        self.config.sync.state_file = path;
        self
    }

    pub fn sync_mirror_delete(mut self, enabled: bool) -> Self {
        self.config.sync.mirror_delete = enabled;
        self
    }

    pub fn sync_full_sync_interval_secs(mut self, secs: u64) -> Self {
        self.config.sync.full_sync_interval_secs = secs;
        self
    }

    // --- auth ---

    pub fn auth_refresh_lead_secs(mut self, secs: u64) -> Self {
        self.config.auth.refresh_lead_secs = secs;
        self
    }

    pub fn auth_keyring_service(mut self, service: impl Into<String>) -> Self {
        self.config.auth.keyring_service = service.into();
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = Some(file);
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

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
