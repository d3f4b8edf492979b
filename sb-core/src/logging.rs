//! Structured logging setup using the `tracing` ecosystem.
//!
//! The file log gets everything at the configured level; the console only
//! shows warnings unless verbose output was requested, so interactive
//! commands keep stdout/stderr readable.

use std::path::Path;

use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::{SbError, SbResult};

/// Rolling file name prefix inside the log directory.
pub const LOG_FILE_PREFIX: &str = "supportbot.log";

/// Dependencies that are chatty at debug level.
const QUIET_DEPENDENCIES: &[&str] = &["hyper_util=warn", "rustls=warn", "tungstenite=warn"];

/// Build a filter from a level or directive string, falling back to `fallback`
/// when it does not parse.
pub fn build_filter(level: &str, fallback: &str) -> EnvFilter {
    let mut directives = vec![level.trim().to_string()];
    directives.extend(QUIET_DEPENDENCIES.iter().map(|d| d.to_string()));
    EnvFilter::try_new(directives.join(","))
        .unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Initialize the global subscriber: daily-rolling file plus stderr console.
///
/// `verbose` lifts the console to debug; otherwise it shows warnings only.
/// The returned guard must be held for the life of the process.
pub fn init_logging(config: &LoggingConfig, log_dir: &Path, verbose: bool) -> SbResult<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_level = if verbose { "debug" } else { config.level.as_str() };
    let console_level = if verbose { "debug" } else { "warn" };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .with_filter(build_filter(console_level, "warn"));

    let file_layer = if config.json_output {
        fmt::layer()
            .with_writer(non_blocking)
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(build_filter(file_level, "info"))
            .boxed()
    } else {
        fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true)
            .with_filter(build_filter(file_level, "info"))
            .boxed()
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| SbError::Internal(format!("logging already initialized: {e}")))?;

    tracing::info!(
        "logging to {} at level={file_level}{}",
        log_dir.display(),
        if config.json_output { " (json)" } else { "" }
    );

    Ok(LogGuard { _guard: guard })
}

/// Keeps the non-blocking file writer alive; dropping it flushes the log.
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_level_hint() {
        use tracing_subscriber::filter::LevelFilter;

        assert_eq!(build_filter("debug", "info").max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(build_filter("warn", "info").max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_init_logging_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig::default();

        let _guard = init_logging(&config, &dir.path().join("logs"), false).unwrap();
        assert!(dir.path().join("logs").is_dir());

        let second = init_logging(&config, dir.path(), true);
        assert!(matches!(second, Err(SbError::Internal(_))));
    }
}
