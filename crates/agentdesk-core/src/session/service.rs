use super::message::ChatMessage;
use super::pending::RequestId;
use crate::agent::AgentId;
use crate::error::{DeskError, Result};

/// Invoked once with the agent's reply.
pub type CompletionCallback = Box<dyn FnOnce(ChatMessage) + Send + 'static>;

/// Invoked once with the classified failure.
pub type ErrorCallback = Box<dyn FnOnce(DeskError) + Send + 'static>;

/// Sends messages to agents without blocking the caller.
pub trait MessageService: Send + Sync {
    /// Appends `text` to the agent's session and starts the round trip.
    ///
    /// Returns as soon as the user message is in the history. Exactly one of
    /// `on_complete` / `on_error` runs later, on whichever thread drains the
    /// notification inbox. Precondition failures (unknown agent, empty text,
    /// busy session) are returned directly and neither callback runs.
    fn send(
        &self,
        agent_id: AgentId,
        text: &str,
        on_complete: CompletionCallback,
        on_error: ErrorCallback,
    ) -> Result<RequestId>;

    /// Conversation for `agent_id`, without the system prompt.
    fn chat_history(&self, agent_id: AgentId) -> Result<Vec<ChatMessage>>;
}
