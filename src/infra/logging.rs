//! For setting up logging.

pub mod rolling;

use self::rolling::RollingFile;
use super::config::LogConfig;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    filter::LevelFilter,
    layer::SubscriberExt,
    registry::LookupSpan,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer,
};

/// Flushes logs upon being dropped.
#[derive(Debug)]
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
}

/// An error that occurred while setting up logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The configured level is not a log level.
    #[error("invalid log level: {0}")]
    InvalidLevel(String),
    /// The log file could not be opened.
    #[error("failed to open log file: {0}")]
    Io(#[from] std::io::Error),
    /// A global subscriber was already installed.
    #[error("failed to install logger: {0}")]
    Init(#[from] TryInitError),
}

/// Parses a configured log level such as `info` or `WARN`.
///
/// Accepts the names `debug`, `info`, `warn`, `error`, `dpanic`, `panic` and
/// `fatal` in any case. The last three log at error level, and an empty level
/// means `info`.
pub fn log_level(level: &str) -> Result<LevelFilter, LoggingError> {
    match level.to_ascii_lowercase().as_str() {
        "debug" => Ok(LevelFilter::DEBUG),
        "" | "info" => Ok(LevelFilter::INFO),
        "warn" => Ok(LevelFilter::WARN),
        "error" | "dpanic" | "panic" | "fatal" => Ok(LevelFilter::ERROR),
        _ => Err(LoggingError::InvalidLevel(level.to_string())),
    }
}

/// Uses `RUST_LOG` if it is set, or the configured level otherwise.
fn env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// JSON lines with source locations, for the log file.
fn file_layer<S>(writer: NonBlocking) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(writer)
        .json()
        .with_file(true)
        .with_line_number(true)
}

/// Initializes logging to stdout and to a size-rotated log file.
pub fn init_logging(config: &LogConfig) -> Result<LogGuard, LoggingError> {
    let level = log_level(&config.level)?;

    let (non_blocking_stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let stdout = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_stdout)
        .with_filter(env_filter(level));

    let file = RollingFile::open(
        &config.filename,
        config.max_size_mb,
        config.max_backups,
        config.max_age_days,
    )?;
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file);
    let file = file_layer(non_blocking_file).with_filter(env_filter(level));

    tracing_subscriber::registry()
        .with(stdout)
        .with(file)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(LogGuard {
        _guards: vec![stdout_guard, file_guard],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_levels_in_any_case() {
        assert_eq!(LevelFilter::DEBUG, log_level("debug").unwrap());
        assert_eq!(LevelFilter::INFO, log_level("Info").unwrap());
        assert_eq!(LevelFilter::WARN, log_level("WARN").unwrap());
        assert_eq!(LevelFilter::ERROR, log_level("error").unwrap());
    }

    #[test]
    fn severe_levels_log_at_error() {
        for level in ["dpanic", "panic", "fatal", "FATAL"] {
            assert_eq!(LevelFilter::ERROR, log_level(level).unwrap(), "{level}");
        }
    }

    #[test]
    fn empty_level_is_info() {
        assert_eq!(LevelFilter::INFO, log_level("").unwrap());
    }

    #[test]
    fn rejects_unknown_level() {
        for level in ["verbose", "trace", "off", "warning", "5", "info,sqlx=warn"] {
            assert!(
                matches!(log_level(level), Err(LoggingError::InvalidLevel(_))),
                "{level}"
            );
        }
    }

    #[test]
    fn file_layer_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let file = RollingFile::with_limits(&path, 0, 0, None).unwrap();
        let (writer, guard) = tracing_appender::non_blocking(file);
        let subscriber = tracing_subscriber::registry().with(file_layer(writer));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(answer = 42, "logger init success");
        });
        drop(guard);

        let contents = std::fs::read_to_string(&path).unwrap();
        let line: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!("INFO", line["level"]);
        assert_eq!("logger init success", line["fields"]["message"]);
        assert_eq!(42, line["fields"]["answer"]);
        assert!(line["timestamp"].is_string());
        assert!(line["line_number"].is_u64());
    }
}
