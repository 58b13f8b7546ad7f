//! Tracing of LLM interactions.
//!
//! The tracer keeps an in-memory record of every gateway round trip so a UI
//! panel can show what was asked, of which model, and how long it took.

use serde::Serialize;
use uuid::Uuid;

use crate::agent::AgentId;
use crate::error::ErrorKind;
use crate::gateway::{GatewayKind, ModelId};
use crate::session::RequestId;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TracerEventKind {
    AgentCreated {
        agent_id: AgentId,
        gateway: GatewayKind,
        model: ModelId,
    },
    AgentRemoved {
        agent_id: AgentId,
    },
    LlmCall {
        agent_id: AgentId,
        request_id: RequestId,
        model: ModelId,
        message_count: usize,
    },
    LlmResponse {
        agent_id: AgentId,
        request_id: RequestId,
        model: ModelId,
        duration_ms: u64,
        reply_chars: usize,
    },
    LlmError {
        agent_id: AgentId,
        request_id: RequestId,
        model: ModelId,
        error: ErrorKind,
        detail: String,
    },
}

/// A timestamped tracer record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TracerEvent {
    pub id: Uuid,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    #[serde(flatten)]
    pub kind: TracerEventKind,
}

impl TracerEvent {
    pub fn new(kind: TracerEventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            kind,
        }
    }

    /// One-line rendering for log panels.
    pub fn summary(&self) -> String {
        match &self.kind {
            TracerEventKind::AgentCreated { agent_id, gateway, model } => {
                format!("agent {} created on {gateway} ({model})", agent_id.short())
            }
            TracerEventKind::AgentRemoved { agent_id } => {
                format!("agent {} removed", agent_id.short())
            }
            TracerEventKind::LlmCall { agent_id, model, message_count, .. } => {
                format!("→ {model} for agent {} ({message_count} messages)", agent_id.short())
            }
            TracerEventKind::LlmResponse { agent_id, model, duration_ms, reply_chars, .. } => {
                format!(
                    "← {model} for agent {} in {duration_ms}ms ({reply_chars} chars)",
                    agent_id.short()
                )
            }
            TracerEventKind::LlmError { agent_id, model, error, detail, .. } => {
                format!("✗ {model} for agent {}: {error:?} {detail}", agent_id.short())
            }
        }
    }
}

/// Called for every event recorded after registration.
pub type TracerCallback = Box<dyn Fn(&TracerEvent) + Send + Sync + 'static>;

/// Observable store of tracer events.
pub trait TracerService: Send + Sync {
    fn record(&self, event: TracerEvent);

    fn register_callback(&self, callback: TracerCallback);

    /// All events in record order.
    fn events(&self) -> Vec<TracerEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_mentions_model() {
        let event = TracerEvent::new(TracerEventKind::LlmCall {
            agent_id: AgentId::new(),
            request_id: RequestId::new(),
            model: "llama3".into(),
            message_count: 3,
        });
        assert!(event.summary().contains("llama3"));
        assert!(event.summary().contains("3 messages"));
    }
}
