//! Agent registry: owns every agent and its chat session.

use std::collections::HashMap;
use std::sync::Arc;

use agentdesk_core::agent::{Agent, AgentDefinition, AgentId, AgentService, AgentStatus};
use agentdesk_core::event::{DeskEvent, EventSink};
use agentdesk_core::gateway::{Gateway, GatewayKind, GatewaySet, ModelId};
use agentdesk_core::session::{ChatSession, ContextBudget};
use agentdesk_core::tracer::{TracerEvent, TracerEventKind, TracerService};
use agentdesk_core::{DeskError, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;

struct AgentEntry {
    agent: Agent,
    session: Arc<ChatSession>,
}

#[derive(Default)]
struct RegistryState {
    /// Insertion order is creation order.
    agents: IndexMap<AgentId, AgentEntry>,
    current: Option<AgentId>,
}

/// In-memory [`AgentService`].
///
/// Reads vastly outnumber writes, so the whole registry sits behind one
/// read-mostly lock. Sessions carry their own locks and are handed out as
/// `Arc`s, so a conversation never holds the registry lock.
pub struct AgentRegistry {
    gateways: GatewaySet,
    budget: ContextBudget,
    events: Arc<dyn EventSink>,
    tracer: Arc<dyn TracerService>,
    state: RwLock<RegistryState>,
    /// Model lists most recently reported per gateway.
    models: RwLock<HashMap<GatewayKind, Vec<ModelId>>>,
}

impl AgentRegistry {
    pub fn new(gateways: GatewaySet, events: Arc<dyn EventSink>, tracer: Arc<dyn TracerService>) -> Self {
        Self {
            gateways,
            budget: ContextBudget::default(),
            events,
            tracer,
            state: RwLock::new(RegistryState::default()),
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Context budget given to every session created from now on.
    pub fn with_budget(mut self, budget: ContextBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn gateways(&self) -> &GatewaySet {
        &self.gateways
    }

    fn validate(&self, definition: &AgentDefinition) -> Result<()> {
        if definition.name.trim().is_empty() {
            return Err(DeskError::validation("Agent name must not be empty"));
        }
        if definition.system_prompt.trim().is_empty() {
            return Err(DeskError::validation("System prompt must not be empty"));
        }
        if self.gateways.get(definition.gateway).is_none() {
            return Err(DeskError::validation(format!(
                "Gateway {} is not configured",
                definition.gateway
            )));
        }

        let models = self.models.read();
        let known = models
            .get(&definition.gateway)
            .is_some_and(|list| list.iter().any(|m| m == &definition.model));
        if !known {
            return Err(DeskError::validation(format!(
                "Model '{}' is not available on {}",
                definition.model, definition.gateway
            )));
        }
        Ok(())
    }

    fn with_entry<T>(&self, id: AgentId, f: impl FnOnce(&AgentEntry) -> T) -> Result<T> {
        let state = self.state.read();
        state
            .agents
            .get(&id)
            .map(f)
            .ok_or_else(|| DeskError::not_found("Agent", id))
    }
}

#[async_trait]
impl AgentService for AgentRegistry {
    async fn refresh_models(&self, kind: GatewayKind) -> Result<Vec<ModelId>> {
        let gateway = self
            .gateways
            .get(kind)
            .ok_or_else(|| DeskError::config(format!("Gateway {kind} is not configured")))?;

        let models = gateway
            .list_models()
            .await
            .map_err(|e| DeskError::gateway(kind, "model list request", e))?;

        tracing::info!(gateway = %kind, count = models.len(), "Refreshed available models");
        self.models.write().insert(kind, models.clone());
        Ok(models)
    }

    fn available_models(&self, kind: GatewayKind) -> Vec<ModelId> {
        self.models.read().get(&kind).cloned().unwrap_or_default()
    }

    fn create_agent(&self, definition: AgentDefinition) -> Result<AgentId> {
        self.validate(&definition)?;

        let agent = Agent::from_definition(definition);
        let session = Arc::new(ChatSession::new(agent.id, agent.system_prompt.clone(), self.budget));
        let id = agent.id;

        {
            let mut state = self.state.write();
            state.agents.insert(
                id,
                AgentEntry {
                    agent: agent.clone(),
                    session,
                },
            );
            if state.current.is_none() {
                state.current = Some(id);
            }
        }

        tracing::info!(agent_id = %id, name = %agent.name, gateway = %agent.gateway, model = %agent.model, "Agent created");
        self.tracer.record(TracerEvent::new(TracerEventKind::AgentCreated {
            agent_id: id,
            gateway: agent.gateway,
            model: agent.model.clone(),
        }));
        self.events.publish(DeskEvent::AgentCreated { agent });
        Ok(id)
    }

    fn list_agents(&self) -> Vec<Agent> {
        self.state.read().agents.values().map(|e| e.agent.clone()).collect()
    }

    fn get_agent(&self, id: AgentId) -> Result<Agent> {
        self.with_entry(id, |e| e.agent.clone())
    }

    fn remove_agent(&self, id: AgentId) -> Result<Agent> {
        let entry = {
            let mut state = self.state.write();
            let entry = state
                .agents
                .shift_remove(&id)
                .ok_or_else(|| DeskError::not_found("Agent", id))?;
            if state.current == Some(id) {
                state.current = None;
            }
            entry
        };

        entry.session.close();

        tracing::info!(agent_id = %id, "Agent removed");
        self.tracer
            .record(TracerEvent::new(TracerEventKind::AgentRemoved { agent_id: id }));
        self.events.publish(DeskEvent::AgentRemoved { agent_id: id });
        Ok(entry.agent)
    }

    fn session(&self, id: AgentId) -> Result<Arc<ChatSession>> {
        self.with_entry(id, |e| Arc::clone(&e.session))
    }

    fn gateway_for(&self, id: AgentId) -> Result<Arc<dyn Gateway>> {
        let kind = self.with_entry(id, |e| e.agent.gateway)?;
        self.gateways
            .get(kind)
            .ok_or_else(|| DeskError::config(format!("Gateway {kind} is not configured")))
    }

    fn set_current_agent(&self, id: AgentId) -> Result<()> {
        let mut state = self.state.write();
        if !state.agents.contains_key(&id) {
            return Err(DeskError::not_found("Agent", id));
        }
        state.current = Some(id);
        Ok(())
    }

    fn current_agent(&self) -> Option<Agent> {
        let state = self.state.read();
        state
            .current
            .and_then(|id| state.agents.get(&id))
            .map(|e| e.agent.clone())
    }

    fn agent_status(&self, id: AgentId) -> Result<AgentStatus> {
        self.with_entry(id, |e| e.session.status())
    }
}
