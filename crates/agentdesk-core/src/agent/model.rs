//! Agent domain model.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gateway::{GatewayKind, ModelId};

/// Unique identifier of an agent (and of the chat session it owns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(Uuid);

impl AgentId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First eight characters, used in log lines and prompts.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AgentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Whether an agent is waiting on its gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AgentStatus {
    #[default]
    Idle,
    Working,
}

/// User-supplied description of an agent to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    pub gateway: GatewayKind,
    pub model: ModelId,
    pub system_prompt: String,
}

impl AgentDefinition {
    pub fn new(
        name: impl Into<String>,
        gateway: GatewayKind,
        model: impl Into<ModelId>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            gateway,
            model: model.into(),
            system_prompt: system_prompt.into(),
        }
    }
}

/// A configured persona the developer can converse with.
///
/// Agents are immutable once created; the registry hands out clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub gateway: GatewayKind,
    pub model: ModelId,
    pub system_prompt: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
}

impl Agent {
    /// Builds an agent from an already validated definition.
    pub fn from_definition(definition: AgentDefinition) -> Self {
        Self {
            id: AgentId::new(),
            name: definition.name,
            gateway: definition.gateway,
            model: definition.model,
            system_prompt: definition.system_prompt,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
