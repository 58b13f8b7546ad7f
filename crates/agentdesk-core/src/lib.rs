//! Domain layer for AgentDesk.
//!
//! Holds the agent and chat-session models, the gateway contract, the service
//! traits the application layer implements, and the shared error type.

pub mod agent;
pub mod config;
pub mod error;
pub mod event;
pub mod gateway;
pub mod goal;
pub mod session;
pub mod tracer;

// Re-export common error type
pub use error::{DeskError, ErrorKind, Result};
