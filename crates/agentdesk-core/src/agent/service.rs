use std::sync::Arc;

use async_trait::async_trait;

use super::model::{Agent, AgentDefinition, AgentId, AgentStatus};
use crate::error::Result;
use crate::gateway::{Gateway, GatewayKind, ModelId};
use crate::session::ChatSession;

/// Creation, lookup and removal of agents and their chat sessions.
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Asks the gateway for its models and remembers the answer.
    async fn refresh_models(&self, gateway: GatewayKind) -> Result<Vec<ModelId>>;

    /// The model list most recently retrieved from `gateway`.
    fn available_models(&self, gateway: GatewayKind) -> Vec<ModelId>;

    /// Validates `definition` and creates the agent together with its session.
    fn create_agent(&self, definition: AgentDefinition) -> Result<AgentId>;

    /// All agents in creation order.
    fn list_agents(&self) -> Vec<Agent>;

    fn get_agent(&self, id: AgentId) -> Result<Agent>;

    /// Removes the agent and closes its session.
    fn remove_agent(&self, id: AgentId) -> Result<Agent>;

    fn session(&self, id: AgentId) -> Result<Arc<ChatSession>>;

    fn gateway_for(&self, id: AgentId) -> Result<Arc<dyn Gateway>>;

    fn set_current_agent(&self, id: AgentId) -> Result<()>;

    fn current_agent(&self) -> Option<Agent>;

    fn agent_status(&self, id: AgentId) -> Result<AgentStatus>;
}
