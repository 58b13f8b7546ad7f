//! Background execution of gateway round trips.

use std::future::Future;
use std::time::Duration;

use agentdesk_core::{DeskError, Result};
use tokio::runtime::Handle;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// How a unit of background work ended.
#[derive(Debug, PartialEq, Eq)]
pub enum ExecutionOutcome<T> {
    Completed(T),
    /// The work exceeded the executor's timeout and was dropped.
    TimedOut(Duration),
    /// The cancellation token fired first.
    Cancelled,
    /// The work panicked; carries the panic message.
    Panicked(String),
}

/// Spawns request futures on a tokio runtime with a timeout and a
/// cancellation token.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    handle: Handle,
    timeout: Duration,
}

impl RequestExecutor {
    pub fn new(handle: Handle, timeout: Duration) -> Self {
        Self { handle, timeout }
    }

    /// Uses the runtime of the calling context.
    pub fn current(timeout: Duration) -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| DeskError::internal(format!("No tokio runtime available: {e}")))?;
        Ok(Self::new(handle, timeout))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `work` in the background and hands its outcome to `on_done`.
    ///
    /// `on_done` runs on a runtime worker, never on the caller's thread, and
    /// runs exactly once even if `work` panics.
    pub fn spawn<F, T, C>(&self, token: CancellationToken, work: F, on_done: C)
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        C: FnOnce(ExecutionOutcome<T>) + Send + 'static,
    {
        let timeout = self.timeout;
        let guarded = self.handle.spawn(run_guarded(token, timeout, work));
        self.handle.spawn(async move {
            let outcome = match guarded.await {
                Ok(outcome) => outcome,
                Err(err) => outcome_from_join_error(err),
            };
            on_done(outcome);
        });
    }
}

fn outcome_from_join_error<T>(err: JoinError) -> ExecutionOutcome<T> {
    if !err.is_panic() {
        // Only runtime shutdown aborts the task.
        return ExecutionOutcome::Cancelled;
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(panic = %message, "Background request panicked");
    ExecutionOutcome::Panicked(message)
}

/// Awaits `work` unless `token` fires or `timeout` elapses first.
pub async fn run_guarded<F, T>(token: CancellationToken, timeout: Duration, work: F) -> ExecutionOutcome<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => ExecutionOutcome::Cancelled,
        result = tokio::time::timeout(timeout, work) => match result {
            Ok(value) => ExecutionOutcome::Completed(value),
            Err(_) => ExecutionOutcome::TimedOut(timeout),
        },
    }
}
