//! Unified path management for AgentDesk files.
//!
//! ```text
//! ~/.config/agentdesk/         # Config directory
//! ├── config.toml              # Application configuration
//! └── logs/                    # Rolling log files
//!     └── agentdesk.log.YYYY-MM-DD
//! ```

use std::path::PathBuf;

use agentdesk_core::DeskError;

const APP_DIR: &str = "agentdesk";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for DeskError {
    fn from(err: PathError) -> Self {
        DeskError::config(err.to_string())
    }
}

pub struct DeskPaths;

impl DeskPaths {
    /// Returns the AgentDesk configuration directory (e.g. `~/.config/agentdesk/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the directory for rolling log files.
    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }
}
