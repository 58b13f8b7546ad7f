//! Service provider: the dependency-injection container.
//!
//! One instance is created at the composition root and passed down. Each
//! [`ServiceKind`] has a factory; the first `get` builds the service and
//! every later `get` returns the same instance. Factories receive the
//! provider, so a service can resolve the services it depends on.

use std::collections::HashMap;
use std::sync::Arc;

use agentdesk_core::agent::AgentService;
use agentdesk_core::config::DeskConfig;
use agentdesk_core::event::EventSink;
use agentdesk_core::gateway::GatewaySet;
use agentdesk_core::goal::GoalService;
use agentdesk_core::session::MessageService;
use agentdesk_core::tracer::TracerService;
use agentdesk_core::{DeskError, Result};
use agentdesk_execution::{Notifier, RequestExecutor};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use strum::{Display, EnumIter};
use tokio::runtime::Handle;

use crate::agent_registry::AgentRegistry;
use crate::dispatcher::MessageDispatcher;
use crate::goal_service::InMemoryGoalService;
use crate::tracer_service::InMemoryTracerService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ServiceKind {
    Agent,
    Message,
    Goal,
    Tracer,
}

/// A resolved service instance.
#[derive(Clone)]
pub enum Service {
    Agent(Arc<dyn AgentService>),
    Message(Arc<dyn MessageService>),
    Goal(Arc<dyn GoalService>),
    Tracer(Arc<dyn TracerService>),
}

impl Service {
    pub fn kind(&self) -> ServiceKind {
        match self {
            Service::Agent(_) => ServiceKind::Agent,
            Service::Message(_) => ServiceKind::Message,
            Service::Goal(_) => ServiceKind::Goal,
            Service::Tracer(_) => ServiceKind::Tracer,
        }
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Service::{}", self.kind())
    }
}

/// Builds a service, resolving dependencies through the provider.
///
/// A factory must not resolve its own kind or call `register`.
pub type ServiceFactory = Box<dyn Fn(&ServiceProvider) -> Result<Service> + Send + Sync>;

fn register_default(provider: &ServiceProvider, kind: ServiceKind, factory: ServiceFactory) {
    // A fresh provider has no instances yet, so this cannot fail.
    if let Err(err) = provider.register(kind, factory) {
        tracing::error!(%kind, error = %err, "Failed to register default service");
    }
}

struct Slot {
    factory: ServiceFactory,
    instance: OnceCell<Service>,
}

#[derive(Default)]
pub struct ServiceProvider {
    slots: RwLock<HashMap<ServiceKind, Slot>>,
}

impl ServiceProvider {
    /// An empty provider; every kind must be registered before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wires the default in-memory implementations.
    ///
    /// Completions, tracer callbacks and UI events are posted to `notifier`;
    /// gateway round trips run on `runtime`.
    pub fn with_defaults(config: &DeskConfig, gateways: GatewaySet, notifier: Notifier, runtime: Handle) -> Self {
        let provider = Self::new();
        let budget = config.context.budget();
        let timeout = config.dispatch.request_timeout();

        let tracer_notifier = notifier.clone();
        register_default(
            &provider,
            ServiceKind::Tracer,
            Box::new(move |_: &ServiceProvider| {
                let tracer = InMemoryTracerService::with_notifier(tracer_notifier.clone());
                Ok(Service::Tracer(Arc::new(tracer)))
            }),
        );
        register_default(
            &provider,
            ServiceKind::Goal,
            Box::new(|_: &ServiceProvider| Ok(Service::Goal(Arc::new(InMemoryGoalService::new())))),
        );

        let events: Arc<dyn EventSink> = Arc::new(notifier.clone());
        register_default(
            &provider,
            ServiceKind::Agent,
            Box::new(move |provider: &ServiceProvider| {
                let registry = AgentRegistry::new(gateways.clone(), Arc::clone(&events), provider.tracer_service()?)
                    .with_budget(budget);
                Ok(Service::Agent(Arc::new(registry)))
            }),
        );
        register_default(
            &provider,
            ServiceKind::Message,
            Box::new(move |provider: &ServiceProvider| {
                let dispatcher = MessageDispatcher::new(
                    provider.agent_service()?,
                    RequestExecutor::new(runtime.clone(), timeout),
                    notifier.clone(),
                    provider.tracer_service()?,
                );
                Ok(Service::Message(Arc::new(dispatcher)))
            }),
        );

        provider
    }

    /// Registers or overrides the factory for `kind`.
    ///
    /// Fails with `AlreadyInitialized` once that kind has been resolved. A
    /// call made while the kind is being constructed waits for construction
    /// to finish and then fails the same way.
    pub fn register(&self, kind: ServiceKind, factory: ServiceFactory) -> Result<()> {
        let mut slots = self.slots.write();
        if slots.get(&kind).is_some_and(|slot| slot.instance.get().is_some()) {
            return Err(DeskError::already_initialized(kind));
        }
        slots.insert(
            kind,
            Slot {
                factory,
                instance: OnceCell::new(),
            },
        );
        Ok(())
    }

    /// Registers an already constructed instance.
    pub fn register_instance(&self, service: Service) -> Result<()> {
        let kind = service.kind();
        self.register(kind, Box::new(move |_: &ServiceProvider| Ok(service.clone())))
    }

    pub fn is_initialized(&self, kind: ServiceKind) -> bool {
        self.slots
            .read_recursive()
            .get(&kind)
            .is_some_and(|slot| slot.instance.get().is_some())
    }

    /// Resolves `kind`, constructing it on first use.
    pub fn get(&self, kind: ServiceKind) -> Result<Service> {
        // The read guard is held while the factory runs so `register` cannot
        // swap the slot mid-construction. Recursive reads let the factory
        // resolve its dependencies even with a writer queued.
        let slots = self.slots.read_recursive();
        let slot = slots
            .get(&kind)
            .ok_or_else(|| DeskError::config(format!("No factory registered for {kind} service")))?;

        let service = slot.instance.get_or_try_init(|| {
            tracing::debug!(%kind, "Constructing service");
            (slot.factory)(self)
        })?;

        if service.kind() != kind {
            return Err(DeskError::config(format!(
                "Factory for {kind} service produced a {} service",
                service.kind()
            )));
        }
        Ok(service.clone())
    }

    pub fn agent_service(&self) -> Result<Arc<dyn AgentService>> {
        match self.get(ServiceKind::Agent)? {
            Service::Agent(service) => Ok(service),
            other => Err(Self::mismatch(ServiceKind::Agent, &other)),
        }
    }

    pub fn message_service(&self) -> Result<Arc<dyn MessageService>> {
        match self.get(ServiceKind::Message)? {
            Service::Message(service) => Ok(service),
            other => Err(Self::mismatch(ServiceKind::Message, &other)),
        }
    }

    pub fn goal_service(&self) -> Result<Arc<dyn GoalService>> {
        match self.get(ServiceKind::Goal)? {
            Service::Goal(service) => Ok(service),
            other => Err(Self::mismatch(ServiceKind::Goal, &other)),
        }
    }

    pub fn tracer_service(&self) -> Result<Arc<dyn TracerService>> {
        match self.get(ServiceKind::Tracer)? {
            Service::Tracer(service) => Ok(service),
            other => Err(Self::mismatch(ServiceKind::Tracer, &other)),
        }
    }

    fn mismatch(expected: ServiceKind, actual: &Service) -> DeskError {
        DeskError::internal(format!("Expected {expected} service, got {}", actual.kind()))
    }
}
