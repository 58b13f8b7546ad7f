//! Session domain module.
//!
//! - `message`: Conversation message types (`MessageRole`, `ChatMessage`)
//! - `context`: Context-window budget and trimming policy
//! - `chat_session`: Per-agent conversation state (`ChatSession`)
//! - `pending`: Correlation records for outstanding requests
//! - `service`: The `MessageService` contract implemented by the dispatcher

mod chat_session;
mod context;
mod message;
mod pending;
mod service;

pub use chat_session::ChatSession;
pub use context::{ContextBudget, DEFAULT_MAX_CONTEXT_TOKENS};
pub use message::{ChatMessage, MessageRole};
pub use pending::{PendingRequest, RequestId};
pub use service::{CompletionCallback, ErrorCallback, MessageService};
