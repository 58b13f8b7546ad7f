//! Agent domain module.

mod model;
mod service;

pub use model::{Agent, AgentDefinition, AgentId, AgentStatus};
pub use service::AgentService;
