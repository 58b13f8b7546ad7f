//! Notifications published to the UI collaborator.

use serde::Serialize;

use crate::agent::{Agent, AgentId};
use crate::error::DeskError;
use crate::session::{ChatMessage, RequestId};

/// Something the UI should render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskEvent {
    AgentCreated {
        agent: Agent,
    },
    AgentRemoved {
        agent_id: AgentId,
    },
    /// A user or agent message was added to a session.
    MessageAppended {
        agent_id: AgentId,
        message: ChatMessage,
    },
    RequestFailed {
        agent_id: AgentId,
        request_id: RequestId,
        error: DeskError,
    },
}

impl DeskEvent {
    pub fn agent_id(&self) -> AgentId {
        match self {
            DeskEvent::AgentCreated { agent } => agent.id,
            DeskEvent::AgentRemoved { agent_id }
            | DeskEvent::MessageAppended { agent_id, .. }
            | DeskEvent::RequestFailed { agent_id, .. } => *agent_id,
        }
    }
}

/// Destination for [`DeskEvent`]s.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: DeskEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, _event: DeskEvent) {}
}
