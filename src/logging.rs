//! Logging module for randr-tail.
//!
//! Diagnostics go to stderr as plain human-readable lines; stdout is reserved
//! for the `+`/`-` output stream. When enabled in the config, the same events
//! are also written as JSON to a daily-rotated file under
//! `~/.local/share/randr-tail/`.

use crate::config::Config;
use crate::error::LoggingError;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log directory name under the user data directory
const LOG_DIR: &str = "randr-tail";
/// Log file name prefix
const LOG_FILE_PREFIX: &str = "randr-tail";
/// Maximum number of log files to retain
const MAX_LOG_FILES: usize = 3;

/// Guard that keeps the non-blocking writers alive.
/// Must be held for the lifetime of the application; dropping it flushes.
pub struct LogGuard {
    _stderr_guard: WorkerGuard,
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the logging system.
///
/// The filter comes from `RUST_LOG` when set, otherwise from
/// `config.log_level`.
pub fn init_logging(config: &Config) -> Result<LogGuard, LoggingError> {
    let env_filter = build_filter(&config.log_level)?;

    let (non_blocking_stderr, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .without_time()
        .with_writer(non_blocking_stderr);

    let (file_layer, file_guard) = if config.log_file {
        let log_dir = get_log_directory()?;
        std::fs::create_dir_all(&log_dir).map_err(|e| LoggingError::DirectoryCreationFailed {
            path: log_dir.display().to_string(),
            source: e,
        })?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .max_log_files(MAX_LOG_FILES)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .build(&log_dir)
            .map_err(|e| LoggingError::AppenderCreationFailed(e.to_string()))?;

        let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

        let layer = fmt::layer()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_current_span(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(non_blocking_file);

        (Some(layer), Some(file_guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(LogGuard {
        _stderr_guard: stderr_guard,
        _file_guard: file_guard,
    })
}

/// `RUST_LOG` wins over the configured level.
fn build_filter(default_level: &str) -> Result<EnvFilter, LoggingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| LoggingError::InvalidFilter(format!("'{}': {}", default_level, e))),
    }
}

/// Get the log directory path, e.g. `~/.local/share/randr-tail`.
fn get_log_directory() -> Result<PathBuf, LoggingError> {
    dirs::data_local_dir()
        .map(|dir| dir.join(LOG_DIR))
        .ok_or(LoggingError::DataDirectoryNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_level_parses() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(build_filter("debug").is_ok());
            assert!(build_filter("randr_tail=trace,warn").is_ok());
        }
    }

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var_os("RUST_LOG").is_none() {
            let err = build_filter("randr_tail=notalevel").unwrap_err();
            assert!(matches!(err, LoggingError::InvalidFilter(_)));
        }
    }

    #[test]
    fn test_get_log_directory() {
        // Only meaningful where a data directory can be resolved
        if let Ok(path) = get_log_directory() {
            assert!(path.ends_with(LOG_DIR));
        }
    }
}
