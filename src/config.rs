//! Runtime configuration resolved from the environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Environment variable overriding the database location.
pub const DB_PATH_VAR: &str = "KB_DB_PATH";

/// Environment variable holding the log filter directive.
pub const LOG_VAR: &str = "KB_LOG";

/// Default log filter when `KB_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Settings for opening the note store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Location of the SQLite database file.
    pub db_path: PathBuf,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
}

impl Config {
    /// Parses configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `KB_DB_PATH`: database file (default `{data_dir}/kb/notes.db`)
    /// - `KB_LOG`: log filter (default `warn`)
    ///
    /// # Errors
    ///
    /// Returns an error if `KB_DB_PATH` is unset and the platform data
    /// directory cannot be determined.
    pub fn from_env() -> Result<Self> {
        let db_path = match std::env::var_os(DB_PATH_VAR) {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => default_database_path()?,
        };

        let log_filter = std::env::var(LOG_VAR)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            db_path,
            log_filter,
        })
    }
}

/// Gets the cross-platform database path.
///
/// Returns the path as `{data_dir}/kb/notes.db` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
pub fn default_database_path() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("kb").join("notes.db"))
}

/// Ensures the parent directory of the database file exists.
///
/// Creates the directory structure if it doesn't exist using `create_dir_all`.
pub fn ensure_database_directory(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }
    Ok(())
}
