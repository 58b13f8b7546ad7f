//! Error types for AgentDesk.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a [`DeskError`], handed to UI collaborators so
/// they can render failures without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    NotFound,
    SessionBusy,
    Gateway,
    Timeout,
    Configuration,
    AlreadyInitialized,
    Io,
    Serialization,
    Internal,
}

/// A shared error type for the entire AgentDesk workspace.
///
/// Registry and service-provider operations return it synchronously; the
/// message dispatcher hands it to `on_error` callbacks instead.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum DeskError {
    /// Invalid agent definition or request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A send was attempted while the session was still waiting for a reply
    #[error("Session for agent '{agent_id}' is busy with an outstanding request")]
    SessionBusy { agent_id: String },

    /// The gateway call failed (network, auth, rate limit)
    #[error("Gateway error for agent '{agent_id}' while sending {message:?}: {cause}")]
    Gateway {
        agent_id: String,
        message: String,
        cause: String,
    },

    /// The gateway call exceeded the configured bound
    #[error("Request for agent '{agent_id}' timed out after {after_secs}s while sending {message:?}")]
    Timeout {
        agent_id: String,
        message: String,
        after_secs: u64,
    },

    /// Service provider or configuration misuse
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Override attempted after the service was constructed
    #[error("Service '{service}' is already initialized")]
    AlreadyInitialized { service: String },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeskError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Creates a SessionBusy error
    pub fn session_busy(agent_id: impl ToString) -> Self {
        Self::SessionBusy {
            agent_id: agent_id.to_string(),
        }
    }

    /// Creates a Gateway error wrapping an opaque cause
    pub fn gateway(agent_id: impl ToString, message: impl Into<String>, cause: impl ToString) -> Self {
        Self::Gateway {
            agent_id: agent_id.to_string(),
            message: message.into(),
            cause: cause.to_string(),
        }
    }

    /// Creates a Timeout error
    pub fn timeout(agent_id: impl ToString, message: impl Into<String>, after_secs: u64) -> Self {
        Self::Timeout {
            agent_id: agent_id.to_string(),
            message: message.into(),
            after_secs,
        }
    }

    /// Creates a Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an AlreadyInitialized error
    pub fn already_initialized(service: impl ToString) -> Self {
        Self::AlreadyInitialized {
            service: service.to_string(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Classification
    // ============================================================================

    /// Returns the coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::SessionBusy { .. } => ErrorKind::SessionBusy,
            Self::Gateway { .. } => ErrorKind::Gateway,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::AlreadyInitialized { .. } => ErrorKind::AlreadyInitialized,
            Self::Io { .. } => ErrorKind::Io,
            Self::Serialization { .. } => ErrorKind::Serialization,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a SessionBusy error
    pub fn is_session_busy(&self) -> bool {
        matches!(self, Self::SessionBusy { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for DeskError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for DeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for DeskError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for DeskError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, DeskError>`.
pub type Result<T> = std::result::Result<T, DeskError>;
