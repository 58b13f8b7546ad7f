//! Per-agent conversational state.

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use super::context::ContextBudget;
use super::message::{ChatMessage, MessageRole};
use super::pending::{PendingRequest, RequestId};
use crate::agent::{AgentId, AgentStatus};
use crate::error::{DeskError, Result};

struct SessionState {
    /// System prompt first, then the conversation in insertion order.
    messages: Vec<ChatMessage>,
    pending: Option<PendingRequest>,
}

/// Ordered conversation history owned by exactly one agent.
///
/// All mutations go through one lock, so the synchronous user append and the
/// asynchronous reply append can never interleave. The history is append-only
/// apart from context trimming, which only ever removes the oldest exchanges.
pub struct ChatSession {
    agent_id: AgentId,
    budget: ContextBudget,
    state: RwLock<SessionState>,
    cancel: CancellationToken,
}

impl ChatSession {
    /// Creates a session whose first message is `system_prompt`.
    pub fn new(agent_id: AgentId, system_prompt: impl Into<String>, budget: ContextBudget) -> Self {
        Self {
            agent_id,
            budget,
            state: RwLock::new(SessionState {
                messages: vec![ChatMessage::system(system_prompt)],
                pending: None,
            }),
            cancel: CancellationToken::new(),
        }
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    pub fn budget(&self) -> ContextBudget {
        self.budget
    }

    /// Conversation after the system prompt, as it is right now.
    ///
    /// Every call re-reads the current state.
    pub fn history(&self) -> Vec<ChatMessage> {
        let state = self.state.read();
        state
            .messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .cloned()
            .collect()
    }

    /// Full message list, system prompt included.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().messages.clone()
    }

    /// The system prompt the session was created with.
    pub fn system_prompt(&self) -> String {
        let state = self.state.read();
        state
            .messages
            .first()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    pub fn append_user_message(&self, text: impl Into<String>) -> ChatMessage {
        self.append(ChatMessage::user(text))
    }

    pub fn append_agent_message(&self, text: impl Into<String>) -> ChatMessage {
        self.append(ChatMessage::assistant(text))
    }

    fn append(&self, message: ChatMessage) -> ChatMessage {
        let mut state = self.state.write();
        state.messages.push(message.clone());
        self.trim_locked(&mut state);
        message
    }

    fn trim_locked(&self, state: &mut SessionState) {
        let removed = self.budget.trim(&mut state.messages);
        if removed > 0 {
            tracing::debug!(agent_id = %self.agent_id, removed, "Trimmed session history to fit context budget");
            if let Some(pending) = state.pending.as_mut() {
                pending.message_index = pending.message_index.saturating_sub(removed);
            }
        }
    }

    /// Appends the user's message and marks the session busy in one step.
    ///
    /// Fails with `SessionBusy` while another request is outstanding and with
    /// `NotFound` once the session has been closed.
    pub fn begin_request(&self, text: impl Into<String>) -> Result<PendingRequest> {
        let text = text.into();
        let mut state = self.state.write();

        if self.cancel.is_cancelled() {
            return Err(DeskError::not_found("Session", self.agent_id));
        }
        if state.pending.is_some() {
            return Err(DeskError::session_busy(self.agent_id));
        }

        state.messages.push(ChatMessage::user(text.clone()));
        self.trim_locked(&mut state);

        let pending = PendingRequest {
            id: RequestId::new(),
            agent_id: self.agent_id,
            message: text,
            message_index: state.messages.len() - 1,
            submitted_at: chrono::Utc::now(),
        };
        state.pending = Some(pending.clone());
        Ok(pending)
    }

    /// Appends the reply for `request_id` and clears the pending record.
    ///
    /// Returns `None` without touching the history when the session was closed
    /// or the request is no longer the outstanding one.
    pub fn complete_request(&self, request_id: RequestId, reply: ChatMessage) -> Option<ChatMessage> {
        let mut state = self.state.write();
        if self.cancel.is_cancelled() || !Self::is_current(&state, request_id) {
            return None;
        }

        state.pending = None;
        state.messages.push(reply.clone());
        self.trim_locked(&mut state);
        Some(reply)
    }

    /// Marks the user message of `request_id` as failed and clears the
    /// pending record. The message itself stays in the history.
    pub fn fail_request(&self, request_id: RequestId, reason: impl Into<String>) -> bool {
        let mut state = self.state.write();
        if self.cancel.is_cancelled() || !Self::is_current(&state, request_id) {
            return false;
        }

        if let Some(pending) = state.pending.take() {
            if let Some(message) = state.messages.get_mut(pending.message_index) {
                message.failure = Some(reason.into());
            }
        }
        true
    }

    /// Sets the failure indicator on the message at `index` (system prompt
    /// included in the indexing). Returns false when out of range.
    pub fn mark_failed(&self, index: usize, reason: impl Into<String>) -> bool {
        let mut state = self.state.write();
        match state.messages.get_mut(index) {
            Some(message) => {
                message.failure = Some(reason.into());
                true
            }
            None => false,
        }
    }

    fn is_current(state: &SessionState, request_id: RequestId) -> bool {
        state
            .pending
            .as_ref()
            .is_some_and(|pending| pending.id == request_id)
    }

    pub fn pending(&self) -> Option<PendingRequest> {
        self.state.read().pending.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.read().pending.is_some()
    }

    pub fn status(&self) -> AgentStatus {
        if self.is_busy() {
            AgentStatus::Working
        } else {
            AgentStatus::Idle
        }
    }

    /// Tears the session down. Outstanding work observes the cancellation and
    /// any late reply is discarded.
    pub fn close(&self) {
        let mut state = self.state.write();
        state.pending = None;
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that fires when the session is closed.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ChatSession")
            .field("agent_id", &self.agent_id)
            .field("messages", &state.messages.len())
            .field("pending", &state.pending.is_some())
            .finish()
    }
}
