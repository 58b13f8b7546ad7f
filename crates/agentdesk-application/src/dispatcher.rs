//! Message dispatcher: non-blocking send with completion callbacks.
//!
//! `send` runs on the coordinating thread. It appends the user message under
//! the session lock and returns; the gateway round trip runs on the tokio
//! worker pool. Results travel back through the [`Notifier`] so callbacks
//! only ever run where the inbox is drained.

use std::sync::Arc;
use std::time::Instant;

use agentdesk_core::agent::{AgentId, AgentService};
use agentdesk_core::event::{DeskEvent, EventSink};
use agentdesk_core::gateway::ModelId;
use agentdesk_core::session::{
    ChatMessage, ChatSession, CompletionCallback, ErrorCallback, MessageService, RequestId,
};
use agentdesk_core::tracer::{TracerEvent, TracerEventKind, TracerService};
use agentdesk_core::{DeskError, Result};
use agentdesk_execution::{ExecutionOutcome, Notifier, RequestExecutor};

/// Default [`MessageService`] implementation.
pub struct MessageDispatcher {
    agents: Arc<dyn AgentService>,
    executor: RequestExecutor,
    notifier: Notifier,
    tracer: Arc<dyn TracerService>,
}

impl MessageDispatcher {
    pub fn new(
        agents: Arc<dyn AgentService>,
        executor: RequestExecutor,
        notifier: Notifier,
        tracer: Arc<dyn TracerService>,
    ) -> Self {
        Self {
            agents,
            executor,
            notifier,
            tracer,
        }
    }
}

impl MessageService for MessageDispatcher {
    fn send(
        &self,
        agent_id: AgentId,
        text: &str,
        on_complete: CompletionCallback,
        on_error: ErrorCallback,
    ) -> Result<RequestId> {
        if text.trim().is_empty() {
            return Err(DeskError::validation("Message must not be empty"));
        }

        let agent = self.agents.get_agent(agent_id)?;
        let session = self.agents.session(agent_id)?;
        let gateway = self.agents.gateway_for(agent_id)?;

        let pending = session.begin_request(text)?;
        let request_id = pending.id;

        // Snapshot taken right after the append; the reply is produced from it.
        let history = session.history();
        if let Some(user_message) = history.last() {
            self.notifier.publish(DeskEvent::MessageAppended {
                agent_id,
                message: user_message.clone(),
            });
        }

        tracing::debug!(%agent_id, %request_id, model = %agent.model, "Dispatching message");
        self.tracer.record(TracerEvent::new(TracerEventKind::LlmCall {
            agent_id,
            request_id,
            model: agent.model.clone(),
            message_count: history.len() + 1,
        }));

        let model = agent.model.clone();
        let system_prompt = agent.system_prompt;
        let started = Instant::now();
        let work = async move { gateway.complete(&history, &model, &system_prompt).await };

        let completion = Completion {
            session: Arc::clone(&session),
            request_id,
            model: agent.model,
            text: pending.message,
            notifier: self.notifier.clone(),
            tracer: Arc::clone(&self.tracer),
            started,
        };

        self.executor.spawn(
            session.cancellation_token(),
            work,
            move |outcome| match outcome {
                ExecutionOutcome::Completed(Ok(reply)) => completion.succeed(reply, on_complete),
                ExecutionOutcome::Completed(Err(err)) => {
                    let error = DeskError::gateway(agent_id, completion.text.clone(), err);
                    completion.fail(error, on_error);
                }
                ExecutionOutcome::TimedOut(after) => {
                    let error = DeskError::timeout(agent_id, completion.text.clone(), after.as_secs());
                    completion.fail(error, on_error);
                }
                ExecutionOutcome::Panicked(panic) => {
                    let cause = format!("gateway panicked: {panic}");
                    let error = DeskError::gateway(agent_id, completion.text.clone(), cause);
                    completion.fail(error, on_error);
                }
                ExecutionOutcome::Cancelled => {
                    tracing::debug!(%agent_id, %request_id, "Request cancelled with its session");
                }
            },
        );

        Ok(request_id)
    }

    fn chat_history(&self, agent_id: AgentId) -> Result<Vec<ChatMessage>> {
        Ok(self.agents.session(agent_id)?.history())
    }
}

/// Worker-side state for settling one request.
struct Completion {
    session: Arc<ChatSession>,
    request_id: RequestId,
    model: ModelId,
    text: String,
    notifier: Notifier,
    tracer: Arc<dyn TracerService>,
    started: Instant,
}

impl Completion {
    fn agent_id(&self) -> AgentId {
        self.session.agent_id()
    }

    fn succeed(self, reply: ChatMessage, on_complete: CompletionCallback) {
        let agent_id = self.agent_id();
        let Some(reply) = self.session.complete_request(self.request_id, reply) else {
            tracing::debug!(%agent_id, request_id = %self.request_id, "Discarding reply for closed session");
            return;
        };

        let duration_ms = self.started.elapsed().as_millis() as u64;
        tracing::info!(%agent_id, request_id = %self.request_id, duration_ms, "Agent replied");
        self.tracer.record(TracerEvent::new(TracerEventKind::LlmResponse {
            agent_id,
            request_id: self.request_id,
            model: self.model,
            duration_ms,
            reply_chars: reply.content.chars().count(),
        }));

        self.notifier.publish(DeskEvent::MessageAppended {
            agent_id,
            message: reply.clone(),
        });
        self.notifier.post(move || on_complete(reply));
    }

    fn fail(self, error: DeskError, on_error: ErrorCallback) {
        let agent_id = self.agent_id();
        if !self.session.fail_request(self.request_id, error.to_string()) {
            tracing::debug!(%agent_id, request_id = %self.request_id, "Discarding failure for closed session");
            return;
        }

        tracing::warn!(%agent_id, request_id = %self.request_id, error = %error, "Request failed");
        self.tracer.record(TracerEvent::new(TracerEventKind::LlmError {
            agent_id,
            request_id: self.request_id,
            model: self.model,
            error: error.kind(),
            detail: error.to_string(),
        }));

        self.notifier.publish(DeskEvent::RequestFailed {
            agent_id,
            request_id: self.request_id,
            error: error.clone(),
        });
        self.notifier.post(move || on_error(error));
    }
}
