//! Application layer for AgentDesk.
//!
//! Implements the service traits from `agentdesk-core`: the agent registry,
//! the message dispatcher, goal tracking, the tracer, and the service
//! provider that wires them together at the composition root.

pub mod agent_registry;
pub mod dispatcher;
pub mod goal_service;
pub mod service_provider;
pub mod tracer_service;

pub use agent_registry::AgentRegistry;
pub use dispatcher::MessageDispatcher;
pub use goal_service::InMemoryGoalService;
pub use service_provider::{Service, ServiceKind, ServiceProvider};
pub use tracer_service::InMemoryTracerService;
