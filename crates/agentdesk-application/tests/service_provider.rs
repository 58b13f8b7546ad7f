use std::sync::Arc;
use std::time::Duration;

use agentdesk_application::{ServiceKind, ServiceProvider};
use agentdesk_core::agent::AgentDefinition;
use agentdesk_core::config::DeskConfig;
use agentdesk_core::gateway::{Gateway, GatewayError, GatewayKind, GatewaySet, ModelId};
use agentdesk_core::session::ChatMessage;
use agentdesk_core::tracer::TracerEvent;
use agentdesk_execution::inbox;
use async_trait::async_trait;
use tokio::runtime::Handle;

struct FixedOpenAI;

#[async_trait]
impl Gateway for FixedOpenAI {
    fn kind(&self) -> GatewayKind {
        GatewayKind::OpenAI
    }

    async fn list_models(&self) -> Result<Vec<ModelId>, GatewayError> {
        Ok(vec!["gpt-4o".into(), "gpt-4o-mini".into()])
    }

    async fn complete(
        &self,
        _history: &[ChatMessage],
        _model: &str,
        system_prompt: &str,
    ) -> Result<ChatMessage, GatewayError> {
        Ok(ChatMessage::assistant(format!("[{system_prompt}] ok")))
    }
}

fn provider() -> (ServiceProvider, agentdesk_execution::Inbox) {
    let (notifier, inbox) = inbox();
    let gateways = GatewaySet::new().with(Arc::new(FixedOpenAI));
    let provider = ServiceProvider::with_defaults(&DeskConfig::default(), gateways, notifier, Handle::current());
    (provider, inbox)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_openai_model_creates_nothing() {
    let (provider, _inbox) = provider();
    let agents = provider.agent_service().unwrap();
    agents.refresh_models(GatewayKind::OpenAI).await.unwrap();

    let err = agents
        .create_agent(AgentDefinition::new(
            "Reviewer",
            GatewayKind::OpenAI,
            "not-a-real-model",
            "Review code.",
        ))
        .unwrap_err();

    assert!(err.is_validation());
    assert!(agents.list_agents().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn wired_services_complete_a_round_trip() {
    let (provider, mut inbox) = provider();
    let agents = provider.agent_service().unwrap();
    let messages = provider.message_service().unwrap();

    agents.refresh_models(GatewayKind::OpenAI).await.unwrap();
    let id = agents
        .create_agent(AgentDefinition::new("Reviewer", GatewayKind::OpenAI, "gpt-4o", "Review code."))
        .unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    messages
        .send(
            id,
            "Look at main.rs",
            Box::new(move |reply| {
                let _ = tx.send(reply.content);
            }),
            Box::new(|err| panic!("unexpected error: {err}")),
        )
        .unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(reply) = rx.try_recv() {
                return reply;
            }
            inbox.dispatch_next(|_| {}).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(reply, "[Review code.] ok");
    assert_eq!(messages.chat_history(id).unwrap().len(), 2);

    let tracer = provider.tracer_service().unwrap();
    assert_eq!(tracer.events().len(), 3);
    assert!(provider.is_initialized(ServiceKind::Message));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tracer_callbacks_run_on_the_draining_thread() {
    let (provider, mut inbox) = provider();
    let agents = provider.agent_service().unwrap();
    let messages = provider.message_service().unwrap();
    let tracer = provider.tracer_service().unwrap();

    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    tracer.register_callback(Box::new(move |event: &TracerEvent| {
        sink.lock().push((std::thread::current().id(), event.summary()));
    }));

    agents.refresh_models(GatewayKind::OpenAI).await.unwrap();
    let id = agents
        .create_agent(AgentDefinition::new("Reviewer", GatewayKind::OpenAI, "gpt-4o", "Review code."))
        .unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    messages
        .send(
            id,
            "Look at main.rs",
            Box::new(move |_| {
                let _ = tx.send(());
            }),
            Box::new(|err| panic!("unexpected error: {err}")),
        )
        .unwrap();

    // Let the reply land; nothing may reach the callback before a drain.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(seen.lock().is_empty());

    tokio::time::timeout(Duration::from_secs(5), async {
        while rx.try_recv().is_err() {
            inbox.dispatch_next(|_| {}).await;
        }
    })
    .await
    .unwrap();

    let coordinating = std::thread::current().id();
    let seen = seen.lock();
    assert_eq!(seen.len(), tracer.events().len());
    assert!(seen.iter().all(|(thread, _)| *thread == coordinating));
}
