//! Logging infrastructure for LocalStory.
//!
//! Provides structured logging with file output and console output:
//! - Writes to `<log_dir>/localstory.log` (cleared on session start)
//! - Also prints to stderr, so command output on stdout stays parseable
//! - Configurable via RUST_LOG; otherwise the configured level, or `debug`
//!   for debug sessions

use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{DEFAULT_LOG_FILE, DEFAULT_LOG_LEVEL};

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize logging system.
///
/// Creates the log directory if needed, clears the previous log file,
/// and sets up dual output to both file and stderr.
///
/// # Arguments
///
/// * `log_dir` - Directory for log files
/// * `log_file` - Log filename (e.g., "localstory.log")
/// * `level` - Filter used when RUST_LOG is not set
/// * `debug` - Forces `debug` level regardless of `level`
///
/// # Errors
///
/// Returns error if log directory cannot be created or log file cannot be cleared
pub fn init_logging(
    log_dir: &Path,
    log_file: &str,
    level: &str,
    debug: bool,
) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;

    // Clear previous log file by writing empty content
    fs::write(log_dir.join(log_file), "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(true)
        .compact();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level, debug)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// The filter directive used when RUST_LOG is not set.
pub fn filter_directive(level: &str, debug: bool) -> String {
    if debug {
        "debug".to_string()
    } else if level.trim().is_empty() {
        DEFAULT_LOG_LEVEL.to_string()
    } else {
        level.trim().to_string()
    }
}

/// Get default log file name.
pub fn default_log_file() -> &'static str {
    DEFAULT_LOG_FILE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_file() {
        assert_eq!(default_log_file(), "localstory.log");
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive("warn", false), "warn");
        assert_eq!(filter_directive("warn", true), "debug");
        assert_eq!(filter_directive("  ", false), "info");
    }

    #[test]
    fn test_clears_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_file = dir.path().join("test.log");
        fs::write(&log_file, "old log data").unwrap();

        // Can't call init_logging because of the global subscriber, but the
        // clearing step is the same write
        fs::write(&log_file, "").unwrap();
        assert_eq!(fs::read_to_string(&log_file).unwrap(), "");
    }

    #[test]
    fn test_guard_structure() {
        use tracing_appender::non_blocking::NonBlocking;

        let (non_blocking, guard) = NonBlocking::new(std::io::sink());
        drop(non_blocking);

        let _logging_guard = LoggingGuard { _file_guard: guard };
    }
}
