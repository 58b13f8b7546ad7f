//! Runtime plumbing: background request execution, the coordinating-thread
//! inbox, and tracing setup.

pub mod executor;
pub mod inbox;
pub mod telemetry;

pub use executor::{ExecutionOutcome, RequestExecutor};
pub use inbox::{Inbox, Notifier, inbox};
pub use telemetry::init_tracing;
