//! Configuration types for the planner.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PlannerError, Result};

/// Hard ceiling on archive (vault) page sizes.
pub const MAX_VAULT_PAGE_SIZE: usize = 500;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// SQLite store settings.
    pub store: StoreConfig,
    /// Planner behavior defaults.
    pub planner: PlannerDefaults,
    /// Log filter settings.
    pub logging: LoggingConfig,
}

/// SQLite store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the database file.
    pub db_path: PathBuf,
    /// How long a connection waits for another writer before failing, in ms.
    ///
    /// Concurrent rollovers on separate connections serialize on SQLite's
    /// write lock; this bounds the wait.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: crate::horizons_dirs::database_file(),
            busy_timeout_ms: 5_000,
        }
    }
}

/// Defaults applied by the planner façade and CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerDefaults {
    /// IANA zone assigned to new users created without an explicit zone.
    pub default_timezone: String,
    /// Page size for archive listings when the caller gives none.
    pub vault_page_size: usize,
}

impl Default for PlannerDefaults {
    fn default() -> Self {
        Self {
            default_timezone: "UTC".to_owned(),
            vault_page_size: 100,
        }
    }
}

impl PlannerDefaults {
    /// Clamp a requested archive page size to `1..=MAX_VAULT_PAGE_SIZE`,
    /// falling back to the configured default.
    #[must_use]
    pub fn vault_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.vault_page_size)
            .clamp(1, MAX_VAULT_PAGE_SIZE)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "horizons=info".to_owned(),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| PlannerError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PlannerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        crate::horizons_dirs::config_file()
    }
}
