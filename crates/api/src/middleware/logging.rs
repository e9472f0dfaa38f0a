//! Logging initialization and configuration.

use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::LoggingConfig;

/// File name prefix for rotated log files.
const LOG_FILE_PREFIX: &str = "coconut";

/// Initializes the logging subsystem based on configuration.
///
/// Logs go to stdout in the configured format and, when `file_dir` is set,
/// to a daily-rotated file. The returned guard must be held until shutdown
/// so buffered file output is flushed.
pub fn init_logging(config: &LoggingConfig, level: &str) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = match config.format.as_str() {
        "json" => fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        _ => fmt::layer()
            .pretty()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .boxed(),
    };

    let (file_layer, guard) = match file_writer(&config.file_dir) {
        Some((writer, guard)) => (
            Some(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(writer),
            ),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

fn file_writer(dir: &str) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    if dir.trim().is_empty() {
        return None;
    }

    if let Err(e) = std::fs::create_dir_all(dir) {
        // The subscriber is not installed yet.
        eprintln!("Failed to create log directory {}: {}; file logging disabled", dir, e);
        return None;
    }

    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}
