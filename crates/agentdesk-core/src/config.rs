//! Application configuration model.
//!
//! Loading lives in `agentdesk-infrastructure`; this module only defines the
//! shape of `config.toml` and its defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DeskError, Result};
use crate::session::{ContextBudget, DEFAULT_MAX_CONTEXT_TOKENS};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct DeskConfig {
    #[serde(default)]
    pub dispatch: DispatchSettings,
    #[serde(default)]
    pub context: ContextSettings,
    #[serde(default)]
    pub openai: OpenAISettings,
    #[serde(default)]
    pub ollama: OllamaSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl DeskConfig {
    /// Rejects values that would make every request fail.
    pub fn validate(&self) -> Result<()> {
        if self.dispatch.request_timeout_secs == 0 {
            return Err(DeskError::config(
                "dispatch.request_timeout_secs must be at least 1",
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DispatchSettings {
    /// Upper bound for a single gateway round trip.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl DispatchSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ContextSettings {
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
}

impl ContextSettings {
    pub fn budget(&self) -> ContextBudget {
        ContextBudget::new(self.max_context_tokens)
    }
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            max_context_tokens: default_max_context_tokens(),
        }
    }
}

fn default_max_context_tokens() -> usize {
    DEFAULT_MAX_CONTEXT_TOKENS
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OpenAISettings {
    /// Without a key the OpenAI gateway is not offered.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
        }
    }
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OllamaSettings {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
        }
    }
}

fn default_ollama_base_url() -> String {
    DEFAULT_OLLAMA_BASE_URL.to_string()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write a daily-rolling log file under the log directory.
    #[serde(default)]
    pub to_file: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
