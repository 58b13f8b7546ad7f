use std::sync::Arc;
use std::time::Duration;

use agentdesk_application::{AgentRegistry, InMemoryTracerService, MessageDispatcher};
use agentdesk_core::agent::{AgentDefinition, AgentId, AgentService, AgentStatus};
use agentdesk_core::event::{DeskEvent, EventSink};
use agentdesk_core::gateway::{Gateway, GatewayError, GatewayKind, GatewaySet, ModelId};
use agentdesk_core::session::{ChatMessage, ContextBudget, MessageRole, MessageService};
use agentdesk_core::tracer::{TracerEventKind, TracerService};
use agentdesk_core::{DeskError, ErrorKind};
use agentdesk_execution::{Inbox, RequestExecutor, inbox};
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

const GATED_MODEL: &str = "llama3.3-70b-32k";
const INSTANT_MODEL: &str = "qwen2.5:7b";
const BROKEN_MODEL: &str = "broken";
const HANGING_MODEL: &str = "hang";
const PANICKING_MODEL: &str = "panics";

/// Replies with "reply to <last user message>".
///
/// The gated model waits for a permit on `gate`. The broken model fails,
/// the panicking model panics and the hanging model never answers.
struct ScriptedGateway {
    gate: Arc<Semaphore>,
}

#[async_trait]
impl Gateway for ScriptedGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Ollama
    }

    async fn list_models(&self) -> Result<Vec<ModelId>, GatewayError> {
        Ok([GATED_MODEL, INSTANT_MODEL, BROKEN_MODEL, HANGING_MODEL, PANICKING_MODEL]
            .iter()
            .map(|m| m.to_string())
            .collect())
    }

    async fn complete(
        &self,
        history: &[ChatMessage],
        model: &str,
        _system_prompt: &str,
    ) -> Result<ChatMessage, GatewayError> {
        match model {
            GATED_MODEL => {
                let permit = self.gate.acquire().await.map_err(|e| GatewayError::transport(e.to_string(), false))?;
                permit.forget();
            }
            BROKEN_MODEL => {
                return Err(GatewayError::Process {
                    status_code: Some(500),
                    message: "model crashed".into(),
                    is_retryable: true,
                    retry_after: None,
                });
            }
            HANGING_MODEL => std::future::pending::<()>().await,
            PANICKING_MODEL => panic!("gateway bug"),
            _ => {}
        }

        let last = history
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(ChatMessage::assistant(format!("reply to {last}")))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Reply(String),
    Failed(ErrorKind),
}

type Outcomes = Arc<Mutex<Vec<(AgentId, Outcome)>>>;

struct Harness {
    registry: Arc<AgentRegistry>,
    dispatcher: MessageDispatcher,
    tracer: Arc<InMemoryTracerService>,
    inbox: Inbox,
    gate: Arc<Semaphore>,
    outcomes: Outcomes,
    events: Vec<DeskEvent>,
}

impl Harness {
    async fn new(timeout: Duration, budget: ContextBudget) -> Self {
        let (notifier, inbox) = inbox();
        let gate = Arc::new(Semaphore::new(0));
        let tracer = Arc::new(InMemoryTracerService::new());
        let events: Arc<dyn EventSink> = Arc::new(notifier.clone());

        let gateways = GatewaySet::new().with(Arc::new(ScriptedGateway {
            gate: Arc::clone(&gate),
        }));
        let registry = Arc::new(
            AgentRegistry::new(gateways, events, tracer.clone()).with_budget(budget),
        );
        registry.refresh_models(GatewayKind::Ollama).await.unwrap();

        let dispatcher = MessageDispatcher::new(
            registry.clone(),
            RequestExecutor::new(Handle::current(), timeout),
            notifier,
            tracer.clone(),
        );

        Self {
            registry,
            dispatcher,
            tracer,
            inbox,
            gate,
            outcomes: Arc::new(Mutex::new(Vec::new())),
            events: Vec::new(),
        }
    }

    async fn standard() -> Self {
        Self::new(Duration::from_secs(30), ContextBudget::default()).await
    }

    fn agent(&self, model: &str) -> AgentId {
        self.registry
            .create_agent(AgentDefinition::new(model, GatewayKind::Ollama, model, "You are helpful."))
            .unwrap()
    }

    fn send(&self, agent_id: AgentId, text: &str) -> Result<(), DeskError> {
        let done = Arc::clone(&self.outcomes);
        let failed = Arc::clone(&self.outcomes);
        self.dispatcher
            .send(
                agent_id,
                text,
                Box::new(move |reply| done.lock().push((agent_id, Outcome::Reply(reply.content)))),
                Box::new(move |err| failed.lock().push((agent_id, Outcome::Failed(err.kind())))),
            )
            .map(|_| ())
    }

    /// Drains the inbox on this task until `count` callbacks have run.
    async fn wait_for_outcomes(&mut self, count: usize) {
        let outcomes = Arc::clone(&self.outcomes);
        let events = &mut self.events;
        let inbox = &mut self.inbox;
        tokio::time::timeout(Duration::from_secs(5), async {
            while outcomes.lock().len() < count {
                if !inbox.dispatch_next(|event| events.push(event.clone())).await {
                    break;
                }
            }
        })
        .await
        .expect("timed out waiting for callbacks");
    }

    fn outcomes(&self) -> Vec<(AgentId, Outcome)> {
        self.outcomes.lock().clone()
    }

    fn history(&self, agent_id: AgentId) -> Vec<(MessageRole, String)> {
        self.dispatcher
            .chat_history(agent_id)
            .unwrap()
            .into_iter()
            .map(|m| (m.role, m.content))
            .collect()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn send_appends_user_message_before_reply_arrives() {
    let mut h = Harness::standard().await;
    let agent = h.agent(GATED_MODEL);

    h.send(agent, "Hi").unwrap();
    assert_eq!(h.history(agent), vec![(MessageRole::User, "Hi".to_string())]);
    assert_eq!(h.registry.agent_status(agent).unwrap(), AgentStatus::Working);
    assert!(h.outcomes().is_empty());

    h.gate.add_permits(1);
    h.wait_for_outcomes(1).await;

    assert_eq!(
        h.history(agent),
        vec![
            (MessageRole::User, "Hi".to_string()),
            (MessageRole::Assistant, "reply to Hi".to_string()),
        ]
    );
    assert_eq!(h.outcomes(), vec![(agent, Outcome::Reply("reply to Hi".into()))]);
    assert_eq!(h.registry.agent_status(agent).unwrap(), AgentStatus::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn callbacks_run_only_when_inbox_is_drained() {
    let mut h = Harness::standard().await;
    let agent = h.agent(INSTANT_MODEL);

    h.send(agent, "ping").unwrap();
    // Give the worker ample time to finish; the callback must still wait.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.outcomes().is_empty());

    h.wait_for_outcomes(1).await;
    assert_eq!(h.outcomes().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sequential_sends_alternate_roles() {
    let mut h = Harness::standard().await;
    let agent = h.agent(INSTANT_MODEL);

    for n in 0..4 {
        h.send(agent, &format!("message {n}")).unwrap();
        h.wait_for_outcomes(n + 1).await;
    }

    let history = h.history(agent);
    assert_eq!(history.len(), 8);
    for (i, (role, content)) in history.iter().enumerate() {
        let n = i / 2;
        if i % 2 == 0 {
            assert_eq!((role, content.as_str()), (&MessageRole::User, format!("message {n}").as_str()));
        } else {
            assert_eq!(role, &MessageRole::Assistant);
            assert_eq!(content, &format!("reply to message {n}"));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn second_send_on_busy_session_fails_fast() {
    let mut h = Harness::standard().await;
    let agent = h.agent(GATED_MODEL);

    h.send(agent, "first").unwrap();
    let err = h.send(agent, "second").unwrap_err();
    assert!(err.is_session_busy());
    assert_eq!(h.history(agent).len(), 1);

    h.gate.add_permits(1);
    h.wait_for_outcomes(1).await;
    // Only the accepted request produced a callback.
    assert_eq!(h.outcomes(), vec![(agent, Outcome::Reply("reply to first".into()))]);

    h.send(agent, "second").unwrap();
    h.gate.add_permits(1);
    h.wait_for_outcomes(2).await;
    assert_eq!(h.history(agent).len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sessions_do_not_block_each_other() {
    let mut h = Harness::standard().await;
    let slow = h.agent(GATED_MODEL);
    let fast = h.agent(INSTANT_MODEL);

    h.send(slow, "slow question").unwrap();
    h.send(fast, "fast question").unwrap();

    h.wait_for_outcomes(1).await;
    assert_eq!(h.outcomes(), vec![(fast, Outcome::Reply("reply to fast question".into()))]);
    assert_eq!(h.history(slow).len(), 1);

    h.gate.add_permits(1);
    h.wait_for_outcomes(2).await;
    assert_eq!(h.history(slow).len(), 2);
    assert_eq!(h.history(fast).len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn removed_session_swallows_late_reply() {
    let mut h = Harness::standard().await;
    let doomed = h.agent(GATED_MODEL);
    let witness = h.agent(INSTANT_MODEL);
    let session = h.registry.session(doomed).unwrap();

    h.send(doomed, "are you there?").unwrap();
    h.registry.remove_agent(doomed).unwrap();
    h.gate.add_permits(1);

    // Run a request on another session to prove the inbox stays healthy.
    h.send(witness, "still alive?").unwrap();
    h.wait_for_outcomes(1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.inbox.try_dispatch(|_| {});

    assert_eq!(h.outcomes(), vec![(witness, Outcome::Reply("reply to still alive?".into()))]);
    assert_eq!(session.history().len(), 1);
    assert!(session.is_closed());
    assert!(h.dispatcher.chat_history(doomed).unwrap_err().is_not_found());
    assert!(h.send(doomed, "hello?").unwrap_err().is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gateway_failure_marks_user_message() {
    let mut h = Harness::standard().await;
    let agent = h.agent(BROKEN_MODEL);

    h.send(agent, "Hi").unwrap();
    h.wait_for_outcomes(1).await;

    assert_eq!(h.outcomes(), vec![(agent, Outcome::Failed(ErrorKind::Gateway))]);
    let history = h.dispatcher.chat_history(agent).unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].is_failed());
    assert_eq!(h.registry.agent_status(agent).unwrap(), AgentStatus::Idle);

    assert!(h.events.iter().any(|e| matches!(
        e,
        DeskEvent::RequestFailed { agent_id, error: DeskError::Gateway { .. }, .. } if *agent_id == agent
    )));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_gateway_reports_error_and_frees_session() {
    let mut h = Harness::standard().await;
    let agent = h.agent(PANICKING_MODEL);

    h.send(agent, "Hi").unwrap();
    h.wait_for_outcomes(1).await;

    assert_eq!(h.outcomes(), vec![(agent, Outcome::Failed(ErrorKind::Gateway))]);
    assert!(h.dispatcher.chat_history(agent).unwrap()[0].is_failed());
    assert_eq!(h.registry.agent_status(agent).unwrap(), AgentStatus::Idle);

    // The session accepts the next message instead of staying busy.
    h.send(agent, "again").unwrap();
    h.wait_for_outcomes(2).await;
    assert_eq!(h.outcomes().len(), 2);
    assert_eq!(h.history(agent).len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_gateway_times_out() {
    let mut h = Harness::new(Duration::from_millis(100), ContextBudget::default()).await;
    let agent = h.agent(HANGING_MODEL);

    h.send(agent, "Hi").unwrap();
    h.wait_for_outcomes(1).await;

    assert_eq!(h.outcomes(), vec![(agent, Outcome::Failed(ErrorKind::Timeout))]);
    assert!(h.dispatcher.chat_history(agent).unwrap()[0].is_failed());
    assert!(!h.registry.session(agent).unwrap().is_busy());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn precondition_failures_are_returned_synchronously() {
    let h = Harness::standard().await;
    let agent = h.agent(INSTANT_MODEL);

    assert!(h.send(agent, "   ").unwrap_err().is_validation());
    assert!(h.send(AgentId::new(), "Hi").unwrap_err().is_not_found());
    assert!(h.history(agent).is_empty());
    assert!(h.outcomes().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn truncation_keeps_latest_exchange() {
    // The system prompt is 4 tokens and each exchange below is 8.
    let mut h = Harness::new(Duration::from_secs(30), ContextBudget::new(30)).await;
    let agent = h.agent(INSTANT_MODEL);

    for n in 0..6 {
        h.send(agent, &format!("question {n}")).unwrap();
        h.wait_for_outcomes(n + 1).await;
    }

    let history = h.history(agent);
    assert!(history.len() < 12);
    assert_eq!(history.len() % 2, 0);
    let tail = &history[history.len() - 2..];
    assert_eq!(tail[0], (MessageRole::User, "question 5".to_string()));
    assert_eq!(tail[1], (MessageRole::Assistant, "reply to question 5".to_string()));

    let session = h.registry.session(agent).unwrap();
    assert_eq!(session.messages()[0].role, MessageRole::System);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn events_and_tracer_follow_the_round_trip() {
    let mut h = Harness::standard().await;
    let agent = h.agent(INSTANT_MODEL);

    h.send(agent, "Hi").unwrap();
    h.wait_for_outcomes(1).await;

    let appended: Vec<MessageRole> = h
        .events
        .iter()
        .filter_map(|e| match e {
            DeskEvent::MessageAppended { message, .. } => Some(message.role),
            _ => None,
        })
        .collect();
    assert_eq!(appended, vec![MessageRole::User, MessageRole::Assistant]);
    assert!(matches!(h.events[0], DeskEvent::AgentCreated { .. }));

    let kinds: Vec<&'static str> = h
        .tracer
        .events()
        .iter()
        .map(|e| match e.kind {
            TracerEventKind::AgentCreated { .. } => "created",
            TracerEventKind::AgentRemoved { .. } => "removed",
            TracerEventKind::LlmCall { .. } => "call",
            TracerEventKind::LlmResponse { .. } => "response",
            TracerEventKind::LlmError { .. } => "error",
        })
        .collect();
    assert_eq!(kinds, vec!["created", "call", "response"]);
}
