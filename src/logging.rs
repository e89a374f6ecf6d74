use std::path::Path;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory: {0}")]
    DirectoryError(String),
    #[error("Failed to install log subscriber: {0}")]
    InitError(String),
}

/// Send tracing output to a daily rolling file under `log_dir`.
///
/// The terminal is left alone for the UI. `RUST_LOG` wins over `default_level`.
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init(log_dir: &Path, default_level: &str) -> Result<WorkerGuard, LoggingError> {
    std::fs::create_dir_all(log_dir).map_err(|e| LoggingError::DirectoryError(e.to_string()))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "calmmind.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(default_level)),
        )
        .with_ansi(false)
        .with_writer(non_blocking)
        .try_init()
        .map_err(|e| LoggingError::InitError(e.to_string()))?;

    Ok(guard)
}

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}
