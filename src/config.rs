//! Configuration module for rackledger.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file (`.rackledger/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `RL_` and use double underscores
//! to separate nested levels:
//! - `RL_WATCH__DEBOUNCE_MS=500` sets `watch.debounce_ms`
//! - `RL_STORE__DUPLICATE_NAMES=allow` sets `store.duplicate_names`
//! - `RL_LOGGING__DEFAULT=debug` sets `logging.default`

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::io::file::ReadPolicy;
use crate::store::DuplicatePolicy;

/// Directory holding the settings file, searched for from the current
/// directory upwards.
pub const CONFIG_DIR: &str = ".rackledger";
pub const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "RL_";

/// Error returned when settings cannot be extracted.
pub type ConfigError = Box<figment::Error>;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Resource files loaded at startup
    #[serde(default = "default_files")]
    pub files: Vec<PathBuf>,

    /// Target for new resources when none is given (defaults to the first of `files`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_file: Option<PathBuf>,

    /// Workspace root directory (where .rackledger is located)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub io: IoConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct StoreConfig {
    /// `reject` (default) or `allow`
    #[serde(default)]
    pub duplicate_names: DuplicatePolicy,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WatchBackendKind {
    /// OS notifications
    #[default]
    Native,
    /// Periodic scanning, for network shares and containers
    Poll,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WatchConfig {
    /// Reload files edited by other programs while running
    #[serde(default)]
    pub enabled: bool,

    /// Quiet period before a changed file is reloaded
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default)]
    pub backend: WatchBackendKind,

    /// Scan interval for the poll backend
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IoConfig {
    /// Read attempts before a locked file is treated as empty
    #[serde(default = "default_read_attempts")]
    pub read_attempts: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Logging configuration.
///
/// ```toml
/// [logging]
/// default = "warn"
///
/// [logging.modules]
/// rackledger = "debug"
/// ```
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for everything not listed in `modules`
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_files() -> Vec<PathBuf> {
    vec![PathBuf::from("config.yaml")]
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_read_attempts() -> u32 {
    5
}
fn default_retry_delay_ms() -> u64 {
    50
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            files: default_files(),
            default_file: None,
            workspace_root: None,
            store: StoreConfig::default(),
            watch: WatchConfig::default(),
            io: IoConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debounce_ms: default_debounce_ms(),
            backend: WatchBackendKind::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            read_attempts: default_read_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl IoConfig {
    pub fn read_policy(&self) -> ReadPolicy {
        ReadPolicy {
            attempts: self.read_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::load_from(config_path).map(|mut settings| {
            if settings.workspace_root.is_none() {
                settings.workspace_root = Self::workspace_root();
            }
            settings
        })
    }

    /// Load configuration from a specific file, then the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels; single underscores
            // stay part of the field name.
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
            .extract()
            .map_err(Box::new)
    }

    /// Find the settings file by looking for .rackledger from the current
    /// directory up to the root.
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Get the workspace root directory (where .rackledger is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::workspace_root_from(&current)
    }

    fn workspace_root_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Resource files, relative entries resolved against the workspace root.
    pub fn resource_files(&self) -> Vec<PathBuf> {
        self.files.iter().map(|file| self.resolve(file)).collect()
    }

    /// Where new resources go when the caller does not name a file.
    pub fn target_file(&self) -> Option<PathBuf> {
        self.default_file
            .as_ref()
            .or_else(|| self.files.first())
            .map(|file| self.resolve(file))
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if file.is_relative() => root.join(file),
            _ => file.to_path_buf(),
        }
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        Self::init_config_file_in(Path::new("."), force)
    }

    /// Create a default settings file under `root`
    pub fn init_config_file_in(
        root: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        // The workspace root is detected at load time so the directory can move.
        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
