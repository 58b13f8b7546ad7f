//! Tracing subscriber setup for binaries.

use std::path::Path;

use agentdesk_core::config::LoggingSettings;
use agentdesk_core::{DeskError, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "agentdesk.log";

/// Builds the filter: `RUST_LOG` wins, otherwise the configured level.
pub fn env_filter(settings: &LoggingSettings) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.level)
            .map_err(|e| DeskError::config(format!("Invalid log level '{}': {e}", settings.level))),
    }
}

/// Installs the global subscriber.
///
/// Console output goes to stderr so it does not interleave with the REPL on
/// stdout. When `settings.to_file` is set a daily-rolling file is written to
/// `log_dir`; the returned guard must be held until shutdown to flush it.
pub fn init_tracing(settings: &LoggingSettings, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(settings)?;
    let console = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let (file_layer, guard) = match (settings.to_file, log_dir) {
        (true, Some(dir)) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        (true, None) => {
            return Err(DeskError::config("File logging enabled but no log directory is available"));
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|_| DeskError::already_initialized("tracing subscriber"))?;

    Ok(guard)
}
