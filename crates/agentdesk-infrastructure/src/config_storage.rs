//! Configuration storage.
//!
//! Loads [`DeskConfig`] from `config.toml`, falling back to defaults when the
//! file is absent, then applies environment overrides.

use std::path::{Path, PathBuf};

use agentdesk_core::config::DeskConfig;
use agentdesk_core::{DeskError, Result};

use crate::paths::DeskPaths;

pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";
pub const ENV_LOG_LEVEL: &str = "AGENTDESK_LOG";

/// Reads and writes `config.toml`.
#[derive(Debug, Clone)]
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Storage at the platform default location.
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: DeskPaths::config_file()?,
        })
    }

    /// Storage at an explicit path (`--config`, tests).
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file only; a missing file yields defaults.
    pub fn load_file(&self) -> Result<DeskConfig> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "Config file not found, using defaults");
            return Ok(DeskConfig::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let config: DeskConfig = toml::from_str(&content).map_err(|e| {
            DeskError::config(format!("Invalid config at {}: {e}", self.path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file and applies process environment overrides.
    pub fn load(&self) -> Result<DeskConfig> {
        let mut config = self.load_file()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }

    /// Writes `config` as pretty TOML, creating parent directories.
    pub fn save(&self, config: &DeskConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Applies environment overrides using `lookup` to read variables.
///
/// Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut DeskConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(key) = get(ENV_OPENAI_API_KEY) {
        config.openai.api_key = Some(key);
    }
    if let Some(url) = get(ENV_OPENAI_BASE_URL) {
        config.openai.base_url = url;
    }
    if let Some(host) = get(ENV_OLLAMA_HOST) {
        config.ollama.base_url = normalize_ollama_host(&host);
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.logging.level = level;
    }
}

// OLLAMA_HOST is commonly given as `host:port` without a scheme.
fn normalize_ollama_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
