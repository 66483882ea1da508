//! Centralized directory paths for horizons.
//!
//! Uses the [`dirs`] crate for platform-appropriate resolution.
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data | `~/Library/Application Support/horizons/` | `~/.local/share/horizons/` |
//! | Config | `~/Library/Application Support/horizons/` | `~/.config/horizons/` |
//!
//! # Environment Overrides
//!
//! - `HORIZONS_DATA_DIR` overrides [`data_dir`]
//! - `HORIZONS_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Database filename within the data directory.
pub const DB_FILENAME: &str = "horizons.db";

/// Application data root directory (holds the SQLite database).
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("HORIZONS_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("horizons"))
        .unwrap_or_else(|| PathBuf::from("/tmp/horizons-data"))
}

/// Application config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("HORIZONS_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("horizons"))
        .unwrap_or_else(|| PathBuf::from("/tmp/horizons-config"))
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default database path (`data_dir()/horizons.db`).
#[must_use]
pub fn database_file() -> PathBuf {
    data_dir().join(DB_FILENAME)
}
